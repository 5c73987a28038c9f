//! Jobs, job eligibility and job-side stat contributions.

use crate::bag::StatBag;
use crate::stat::Stat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A character job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Job {
    War,
    Mnk,
    Whm,
    Blm,
    Rdm,
    Thf,
    Pld,
    Drk,
    Bst,
    Brd,
    Rng,
    Sam,
    Nin,
    Drg,
    Smn,
    Blu,
    Cor,
    Pup,
    Dnc,
    Sch,
    Geo,
    Run,
}

impl Job {
    /// All jobs, in bit order for [`JobSet`].
    pub const ALL: [Job; 22] = [
        Job::War,
        Job::Mnk,
        Job::Whm,
        Job::Blm,
        Job::Rdm,
        Job::Thf,
        Job::Pld,
        Job::Drk,
        Job::Bst,
        Job::Brd,
        Job::Rng,
        Job::Sam,
        Job::Nin,
        Job::Drg,
        Job::Smn,
        Job::Blu,
        Job::Cor,
        Job::Pup,
        Job::Dnc,
        Job::Sch,
        Job::Geo,
        Job::Run,
    ];

    /// Three-letter job code.
    pub fn code(self) -> &'static str {
        match self {
            Job::War => "WAR",
            Job::Mnk => "MNK",
            Job::Whm => "WHM",
            Job::Blm => "BLM",
            Job::Rdm => "RDM",
            Job::Thf => "THF",
            Job::Pld => "PLD",
            Job::Drk => "DRK",
            Job::Bst => "BST",
            Job::Brd => "BRD",
            Job::Rng => "RNG",
            Job::Sam => "SAM",
            Job::Nin => "NIN",
            Job::Drg => "DRG",
            Job::Smn => "SMN",
            Job::Blu => "BLU",
            Job::Cor => "COR",
            Job::Pup => "PUP",
            Job::Dnc => "DNC",
            Job::Sch => "SCH",
            Job::Geo => "GEO",
            Job::Run => "RUN",
        }
    }

    /// Parse a three-letter job code, case-insensitively.
    pub fn parse(code: &str) -> Option<Job> {
        Job::ALL
            .iter()
            .copied()
            .find(|job| job.code().eq_ignore_ascii_case(code))
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Set of jobs able to equip an item.
///
/// Serialized as a list of job codes; `["ALL"]` is accepted on input.
///
/// # Examples
///
/// ```rust
/// use zzgear::{Job, JobSet};
///
/// let melee = JobSet::of(&[Job::War, Job::Sam]);
/// assert!(melee.contains(Job::Sam));
/// assert!(!melee.contains(Job::Whm));
/// assert!(JobSet::all().contains(Job::Whm));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JobSet(u32);

impl JobSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Job::ALL.iter().fold(Self(0), |set, job| set.with(*job))
    }

    pub fn of(jobs: &[Job]) -> Self {
        jobs.iter().fold(Self(0), |set, job| set.with(*job))
    }

    pub fn with(self, job: Job) -> Self {
        Self(self.0 | job.bit())
    }

    pub fn contains(self, job: Job) -> bool {
        self.0 & job.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Job> {
        Job::ALL.into_iter().filter(move |job| self.contains(*job))
    }
}

impl Serialize for JobSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.iter().map(Job::code))
    }
}

impl<'de> Deserialize<'de> for JobSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let codes = Vec::<String>::deserialize(deserializer)?;
        let mut set = JobSet::empty();
        for code in codes {
            if code.eq_ignore_ascii_case("ALL") {
                set = JobSet::all();
                continue;
            }
            let job = Job::parse(&code)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown job: {}", code)))?;
            set = set.with(job);
        }
        Ok(set)
    }
}

/// The character being geared: job, sub job and the job-side stat bags.
///
/// Base stats, traits and gifts are supplied by the job reference table;
/// the engine only sums them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProfile {
    pub job: Job,
    #[serde(default)]
    pub sub_job: Option<Job>,
    /// Race/job base attributes and combat skills at the level cap.
    #[serde(default)]
    pub base: StatBag,
    /// Job and sub-job trait contributions.
    #[serde(default)]
    pub traits: StatBag,
    /// Job point gift contributions.
    #[serde(default)]
    pub gifts: StatBag,
    /// Job points spent on the main job.
    #[serde(default)]
    pub job_points: u32,
    /// Whether the job may hold a weapon in the sub slot.
    #[serde(default)]
    pub dual_wield: bool,
}

impl JobProfile {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            sub_job: None,
            base: StatBag::new(),
            traits: StatBag::new(),
            gifts: StatBag::new(),
            job_points: 0,
            dual_wield: false,
        }
    }

    pub fn with_sub_job(mut self, sub_job: Job) -> Self {
        self.sub_job = Some(sub_job);
        self
    }

    pub fn with_base(mut self, base: StatBag) -> Self {
        self.base = base;
        self
    }

    pub fn with_traits(mut self, traits: StatBag) -> Self {
        self.traits = traits;
        self
    }

    pub fn with_gifts(mut self, gifts: StatBag) -> Self {
        self.gifts = gifts;
        self
    }

    pub fn with_job_points(mut self, job_points: u32) -> Self {
        self.job_points = job_points;
        self
    }

    pub fn with_dual_wield(mut self, dual_wield: bool) -> Self {
        self.dual_wield = dual_wield;
        self
    }
}

/// Master level bonus curve.
///
/// Each master level adds `per_level` once. Only jobs with at least
/// `eligibility_job_points` spent receive anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterLevelTable {
    pub per_level: StatBag,
    pub max_level: u8,
    pub eligibility_job_points: u32,
}

impl MasterLevelTable {
    /// Stat bonus for a job profile at a master level.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzgear::{Job, JobProfile, MasterLevelTable, Stat};
    ///
    /// let table = MasterLevelTable::default();
    /// let capped = JobProfile::new(Job::War).with_job_points(2100);
    /// let fresh = JobProfile::new(Job::War);
    ///
    /// assert_eq!(table.bonus(&capped, 10).get(Stat::Str), 10.0);
    /// assert_eq!(table.bonus(&capped, 99).get(Stat::Str), 50.0);
    /// assert!(table.bonus(&fresh, 10).is_empty());
    /// ```
    pub fn bonus(&self, job: &JobProfile, level: u8) -> StatBag {
        if job.job_points < self.eligibility_job_points {
            return StatBag::new();
        }
        let levels = f64::from(level.min(self.max_level));
        self.per_level
            .iter()
            .fold(StatBag::new(), |mut bag, (key, value)| {
                bag.add_key(&key, value * levels);
                bag
            })
    }
}

impl Default for MasterLevelTable {
    fn default() -> Self {
        let per_level = [
            Stat::Str,
            Stat::Dex,
            Stat::Vit,
            Stat::Agi,
            Stat::Int,
            Stat::Mnd,
            Stat::Chr,
        ]
        .into_iter()
        .map(|stat| (stat, 1.0))
        .chain([(Stat::Hp, 10.0), (Stat::Mp, 5.0)])
        .collect();
        Self {
            per_level,
            max_level: 50,
            eligibility_job_points: 2100,
        }
    }
}
