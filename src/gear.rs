//! Gear sets: one optional item per equipment slot.

use crate::augment::{PathChoice, PathConfigs};
use crate::error::GearError;
use crate::item::{Item, ItemId, Slot, WeaponInfo};
use crate::job::Job;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// An item in a slot, with the augment path bound to it (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipped {
    pub item: Arc<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathChoice>,
}

impl Equipped {
    pub fn new(item: Arc<Item>) -> Self {
        Self { item, path: None }
    }

    pub fn with_path(mut self, path: PathChoice) -> Self {
        self.path = Some(path);
        self
    }

    pub fn id(&self) -> ItemId {
        self.item.id
    }
}

impl From<Arc<Item>> for Equipped {
    fn from(item: Arc<Item>) -> Self {
        Self::new(item)
    }
}

impl From<Item> for Equipped {
    fn from(item: Item) -> Self {
        Self::new(Arc::new(item))
    }
}

/// A full or partial gear set.
///
/// Slots are indexed by [`Slot::index`]. [`GearSet::equip`] enforces slot
/// fit, job eligibility is checked by [`GearSet::validate`], and a
/// two-handed main weapon always leaves `Sub` empty.
///
/// # Examples
///
/// ```rust
/// use zzgear::{EquipSlot, GearSet, Item, SkillType, Slot, WeaponInfo};
///
/// let sword = Item::new(1, "Naegling", EquipSlot::Main)
///     .with_weapon(WeaponInfo::new(166.0, 240.0, SkillType::Sword));
/// let shield = Item::new(2, "Blurred Shield", EquipSlot::Sub);
///
/// let mut gear = GearSet::new();
/// gear.equip(Slot::Main, sword.into()).unwrap();
/// gear.equip(Slot::Sub, shield.into()).unwrap();
/// assert_eq!(gear.len(), 2);
/// assert_eq!(gear.main_weapon().unwrap().delay, 240.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GearSet {
    slots: [Option<Equipped>; 16],
}

impl GearSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&Equipped> {
        self.slots[slot.index()].as_ref()
    }

    pub fn item(&self, slot: Slot) -> Option<&Item> {
        self.get(slot).map(|equipped| equipped.item.as_ref())
    }

    /// Put an item in a slot after checking that it fits.
    ///
    /// Equipping a two-handed weapon in `Main` clears `Sub`; equipping
    /// anything in `Sub` behind a two-handed main is an error.
    pub fn equip(&mut self, slot: Slot, equipped: Equipped) -> Result<(), GearError> {
        if !equipped.item.slot.fits(slot) {
            return Err(GearError::SlotMismatch {
                item: equipped.item.name.clone(),
                slot,
            });
        }
        if slot == Slot::Sub && self.is_two_handed_main() {
            return Err(GearError::TwoHandedConflict(
                self.item(Slot::Main)
                    .map(|item| item.name.clone())
                    .unwrap_or_default(),
            ));
        }
        if slot == Slot::Main && equipped.item.is_two_handed() {
            self.slots[Slot::Sub.index()] = None;
        }
        self.slots[slot.index()] = Some(equipped);
        Ok(())
    }

    /// Builder-style [`GearSet::equip`].
    pub fn with(mut self, slot: Slot, equipped: impl Into<Equipped>) -> Result<Self, GearError> {
        self.equip(slot, equipped.into())?;
        Ok(self)
    }

    /// Unchecked placement used by the optimizer, whose candidate pools are
    /// already filtered for fit and eligibility.
    pub(crate) fn place(&mut self, slot: Slot, equipped: Option<Equipped>) {
        self.slots[slot.index()] = equipped;
    }

    pub fn clear(&mut self, slot: Slot) -> Option<Equipped> {
        self.slots[slot.index()].take()
    }

    /// Occupied slots in [`Slot::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Equipped)> {
        Slot::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(slot, equipped)| equipped.as_ref().map(|e| (*slot, e)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn main_weapon(&self) -> Option<&WeaponInfo> {
        self.item(Slot::Main).and_then(|item| item.weapon.as_ref())
    }

    /// The weapon in `Sub`, if the sub slot holds a weapon rather than a shield or grip.
    pub fn sub_weapon(&self) -> Option<&WeaponInfo> {
        self.item(Slot::Sub)
            .filter(|item| item.is_weapon())
            .and_then(|item| item.weapon.as_ref())
    }

    pub fn ranged_weapon(&self) -> Option<&WeaponInfo> {
        self.item(Slot::Ranged).and_then(|item| item.weapon.as_ref())
    }

    pub fn is_two_handed_main(&self) -> bool {
        self.item(Slot::Main)
            .map(Item::is_two_handed)
            .unwrap_or(false)
    }

    /// Check job eligibility, slot fit, the two-handed rule and the sub-weapon rule.
    pub fn validate(&self, job: Job, dual_wield: bool) -> Result<(), GearError> {
        for (slot, equipped) in self.iter() {
            let item = &equipped.item;
            if !item.equippable_by(job) {
                return Err(GearError::JobRestricted {
                    item: item.name.clone(),
                    job,
                });
            }
            if !item.slot.fits(slot) {
                return Err(GearError::SlotMismatch {
                    item: item.name.clone(),
                    slot,
                });
            }
        }
        if self.is_two_handed_main() && self.get(Slot::Sub).is_some() {
            return Err(GearError::TwoHandedConflict(
                self.item(Slot::Main)
                    .map(|item| item.name.clone())
                    .unwrap_or_default(),
            ));
        }
        if let Some(sub) = self.item(Slot::Sub) {
            if sub.is_weapon() && !dual_wield {
                return Err(GearError::DualWieldRequired(sub.name.clone()));
            }
        }
        for pair in [[Slot::Ear1, Slot::Ear2], [Slot::Ring1, Slot::Ring2]] {
            if let (Some(a), Some(b)) = (self.item(pair[0]), self.item(pair[1])) {
                if a.id == b.id && a.rare {
                    return Err(GearError::RareDuplicate(a.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Bind path configs to the items they were chosen for.
    ///
    /// Configs naming a different item than the one in the slot are stale
    /// and ignored. A path already set on the equipped item is kept.
    pub fn bind_paths(&mut self, configs: &PathConfigs) {
        for (slot, equipped) in Slot::ALL.iter().zip(self.slots.iter_mut()) {
            if let Some(equipped) = equipped {
                match configs.choice_for(*slot, equipped.item.id) {
                    Some(choice) => equipped.path = Some(choice),
                    None => {
                        if let Some(stale) = configs.get(*slot) {
                            debug!(
                                slot = %slot,
                                configured = stale.item_id,
                                equipped = equipped.item.id,
                                "ignoring stale path config"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Order-insensitive identity of the set: ear and ring pairs are sorted
    /// so that mirrored sets compare equal.
    pub fn signature(&self) -> [Option<(ItemId, Option<PathChoice>)>; 16] {
        let mut keys: [Option<(ItemId, Option<PathChoice>)>; 16] = Default::default();
        for (i, equipped) in self.slots.iter().enumerate() {
            keys[i] = equipped.as_ref().map(|e| (e.item.id, e.path));
        }
        for (a, b) in [(Slot::Ear1, Slot::Ear2), (Slot::Ring1, Slot::Ring2)] {
            let (ia, ib) = (a.index(), b.index());
            if sort_key(&keys[ia]) > sort_key(&keys[ib]) {
                keys.swap(ia, ib);
            }
        }
        keys
    }
}

fn sort_key(key: &Option<(ItemId, Option<PathChoice>)>) -> (u8, ItemId, Option<(u8, u32)>) {
    match key {
        None => (0, 0, None),
        Some((id, path)) => (1, *id, path.map(|p| (p.path as u8, p.rank))),
    }
}

impl Serialize for GearSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (slot, equipped) in self.iter() {
            map.serialize_entry(slot.as_str(), equipped)?;
        }
        map.end()
    }
}

/// Slots are equipped in [`Slot::ALL`] order, so a two-handed main weapon
/// next to a sub item is rejected.
impl<'de> Deserialize<'de> for GearSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let slots = BTreeMap::<Slot, Equipped>::deserialize(deserializer)?;
        let mut gear = GearSet::new();
        for (slot, equipped) in slots {
            gear.equip(slot, equipped).map_err(serde::de::Error::custom)?;
        }
        Ok(gear)
    }
}
