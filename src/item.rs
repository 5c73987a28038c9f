//! Items, equipment slots and weapon attributes.

use crate::bag::StatBag;
use crate::job::{Job, JobSet};
use crate::stat::Stat;
use serde::{Deserialize, Serialize};

/// Numeric item identity, as used by the item catalog and path tables.
pub type ItemId = u32;

/// One of the sixteen equipment slots of a gear set.
///
/// [`Slot::ALL`] is also the fixed order in which the optimizer fills
/// slots; `Main` comes first so the two-handed rule can constrain `Sub`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Main,
    Sub,
    Ranged,
    Ammo,
    Head,
    Neck,
    Ear1,
    Ear2,
    Body,
    Hands,
    Ring1,
    Ring2,
    Back,
    Waist,
    Legs,
    Feet,
}

impl Slot {
    pub const ALL: [Slot; 16] = [
        Slot::Main,
        Slot::Sub,
        Slot::Ranged,
        Slot::Ammo,
        Slot::Head,
        Slot::Neck,
        Slot::Ear1,
        Slot::Ear2,
        Slot::Body,
        Slot::Hands,
        Slot::Ring1,
        Slot::Ring2,
        Slot::Back,
        Slot::Waist,
        Slot::Legs,
        Slot::Feet,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Main => "main",
            Slot::Sub => "sub",
            Slot::Ranged => "ranged",
            Slot::Ammo => "ammo",
            Slot::Head => "head",
            Slot::Neck => "neck",
            Slot::Ear1 => "ear1",
            Slot::Ear2 => "ear2",
            Slot::Body => "body",
            Slot::Hands => "hands",
            Slot::Ring1 => "ring1",
            Slot::Ring2 => "ring2",
            Slot::Back => "back",
            Slot::Waist => "waist",
            Slot::Legs => "legs",
            Slot::Feet => "feet",
        }
    }

    /// The other half of an ear or ring pair.
    pub fn paired(self) -> Option<Slot> {
        match self {
            Slot::Ear1 => Some(Slot::Ear2),
            Slot::Ear2 => Some(Slot::Ear1),
            Slot::Ring1 => Some(Slot::Ring2),
            Slot::Ring2 => Some(Slot::Ring1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an item can be worn, as stated by item data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// A weapon; may also go in `Sub` for jobs that can dual wield.
    Main,
    /// Shields and grips.
    Sub,
    Ranged,
    Ammo,
    Head,
    Neck,
    Ear,
    Body,
    Hands,
    Ring,
    Back,
    Waist,
    Legs,
    Feet,
}

impl EquipSlot {
    /// Whether an item of this kind can physically occupy `slot`.
    ///
    /// Dual-wield eligibility for weapons in `Sub` is checked separately.
    pub fn fits(self, slot: Slot) -> bool {
        matches!(
            (self, slot),
            (EquipSlot::Main, Slot::Main)
                | (EquipSlot::Main, Slot::Sub)
                | (EquipSlot::Sub, Slot::Sub)
                | (EquipSlot::Ranged, Slot::Ranged)
                | (EquipSlot::Ammo, Slot::Ammo)
                | (EquipSlot::Head, Slot::Head)
                | (EquipSlot::Neck, Slot::Neck)
                | (EquipSlot::Ear, Slot::Ear1)
                | (EquipSlot::Ear, Slot::Ear2)
                | (EquipSlot::Body, Slot::Body)
                | (EquipSlot::Hands, Slot::Hands)
                | (EquipSlot::Ring, Slot::Ring1)
                | (EquipSlot::Ring, Slot::Ring2)
                | (EquipSlot::Back, Slot::Back)
                | (EquipSlot::Waist, Slot::Waist)
                | (EquipSlot::Legs, Slot::Legs)
                | (EquipSlot::Feet, Slot::Feet)
        )
    }
}

/// Combat skill a weapon trains and is governed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillType {
    HandToHand,
    Dagger,
    Sword,
    GreatSword,
    Axe,
    GreatAxe,
    Scythe,
    Polearm,
    Katana,
    GreatKatana,
    Club,
    Staff,
    Archery,
    Marksmanship,
    Throwing,
}

impl SkillType {
    /// Two-handed skills occupy both main and sub.
    pub fn is_two_handed(self) -> bool {
        matches!(
            self,
            SkillType::HandToHand
                | SkillType::GreatSword
                | SkillType::GreatAxe
                | SkillType::Scythe
                | SkillType::Polearm
                | SkillType::GreatKatana
                | SkillType::Staff
        )
    }

    pub fn is_ranged(self) -> bool {
        matches!(
            self,
            SkillType::Archery | SkillType::Marksmanship | SkillType::Throwing
        )
    }

    /// The stat holding the character's rating in this skill.
    pub fn skill_stat(self) -> Stat {
        match self {
            SkillType::HandToHand => Stat::HandToHandSkill,
            SkillType::Dagger => Stat::DaggerSkill,
            SkillType::Sword => Stat::SwordSkill,
            SkillType::GreatSword => Stat::GreatSwordSkill,
            SkillType::Axe => Stat::AxeSkill,
            SkillType::GreatAxe => Stat::GreatAxeSkill,
            SkillType::Scythe => Stat::ScytheSkill,
            SkillType::Polearm => Stat::PolearmSkill,
            SkillType::Katana => Stat::KatanaSkill,
            SkillType::GreatKatana => Stat::GreatKatanaSkill,
            SkillType::Club => Stat::ClubSkill,
            SkillType::Staff => Stat::StaffSkill,
            SkillType::Archery => Stat::ArcherySkill,
            SkillType::Marksmanship => Stat::MarksmanshipSkill,
            SkillType::Throwing => Stat::ThrowingSkill,
        }
    }
}

/// Magic and day/weather element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Fire,
    Ice,
    Wind,
    Earth,
    Lightning,
    Water,
    Light,
    Dark,
}

/// Weapon sub-attributes. Delay is in game ticks (60 per second).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponInfo {
    pub damage: f64,
    pub delay: f64,
    #[serde(default)]
    pub skill: Option<SkillType>,
}

impl WeaponInfo {
    pub fn new(damage: f64, delay: f64, skill: SkillType) -> Self {
        Self {
            damage,
            delay,
            skill: Some(skill),
        }
    }

    pub fn is_two_handed(&self) -> bool {
        self.skill.map(SkillType::is_two_handed).unwrap_or(false)
    }
}

/// An equippable item.
///
/// # Examples
///
/// ```rust
/// use zzgear::{EquipSlot, Item, Job, JobSet, Slot, Stat, StatBag};
///
/// let ring = Item::new(11, "Chirich Ring", EquipSlot::Ring)
///     .with_jobs(JobSet::all())
///     .with_stats(StatBag::new().with(Stat::StoreTp, 6.0));
///
/// assert!(ring.equippable_by(Job::Thf));
/// assert!(ring.slot.fits(Slot::Ring2));
/// assert!(!ring.slot.fits(Slot::Ear1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub slot: EquipSlot,
    pub jobs: JobSet,
    #[serde(default)]
    pub stats: StatBag,
    #[serde(default)]
    pub weapon: Option<WeaponInfo>,
    /// Elements this item boosts regardless of day or weather chance.
    #[serde(default)]
    pub affinity: Vec<Element>,
    /// Key into the path augment table, if the item has path augments.
    #[serde(default)]
    pub augment_ref: Option<ItemId>,
    /// A rare item can be owned only once, so it never fills both slots of a pair.
    #[serde(default)]
    pub rare: bool,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, slot: EquipSlot) -> Self {
        Self {
            id,
            name: name.into(),
            slot,
            jobs: JobSet::all(),
            stats: StatBag::new(),
            weapon: None,
            affinity: Vec::new(),
            augment_ref: None,
            rare: false,
        }
    }

    pub fn with_jobs(mut self, jobs: JobSet) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_stats(mut self, stats: StatBag) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_weapon(mut self, weapon: WeaponInfo) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_affinity(mut self, element: Element) -> Self {
        self.affinity.push(element);
        self
    }

    pub fn with_augment_ref(mut self, key: ItemId) -> Self {
        self.augment_ref = Some(key);
        self
    }

    pub fn rare(mut self) -> Self {
        self.rare = true;
        self
    }

    /// Key used to look the item up in the path augment table.
    pub fn path_key(&self) -> ItemId {
        self.augment_ref.unwrap_or(self.id)
    }

    pub fn equippable_by(&self, job: Job) -> bool {
        self.jobs.contains(job)
    }

    pub fn is_weapon(&self) -> bool {
        self.weapon.is_some() && self.slot == EquipSlot::Main
    }

    pub fn is_two_handed(&self) -> bool {
        self.weapon.as_ref().map(WeaponInfo::is_two_handed).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_order_starts_with_main() {
        assert_eq!(Slot::ALL[0], Slot::Main);
        assert_eq!(Slot::ALL[1], Slot::Sub);
        for (i, slot) in Slot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_weapon_fits_sub() {
        assert!(EquipSlot::Main.fits(Slot::Sub));
        assert!(!EquipSlot::Sub.fits(Slot::Main));
    }

    #[test]
    fn test_two_handed_skills() {
        assert!(SkillType::GreatSword.is_two_handed());
        assert!(!SkillType::Sword.is_two_handed());
        let scythe = Item::new(1, "Scythe", EquipSlot::Main)
            .with_weapon(WeaponInfo::new(300.0, 528.0, SkillType::Scythe));
        assert!(scythe.is_two_handed());
    }

    #[test]
    fn test_item_deserialize_defaults() {
        let item: Item = serde_json::from_str(
            r#"{"id":5,"name":"Moonbeam Nodowa","slot":"neck","jobs":["ALL"],"stats":{"Accuracy":10}}"#,
        )
        .unwrap();
        assert_eq!(item.stats.get(Stat::Accuracy), 10.0);
        assert!(item.weapon.is_none());
        assert!(!item.rare);
    }
}
