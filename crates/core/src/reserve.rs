//! Reserve project domain types, status state machine, and input validation.
//!
//! A reserve project moves strictly forward through
//! `Draft -> EnteredDb -> EarlyPlan -> OutStorageInspect`. Status ids match
//! the `reserve_project_statuses` seed data (1-based SMALLINT).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum length for descriptive text fields (characters).
pub const MAX_FIELD_LENGTH: usize = 255;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a reserve project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ReserveStatus {
    Draft = 1,
    EnteredDb = 2,
    EarlyPlan = 3,
    OutStorageInspect = 4,
}

impl ReserveStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [ReserveStatus; 4] = [
        ReserveStatus::Draft,
        ReserveStatus::EnteredDb,
        ReserveStatus::EarlyPlan,
        ReserveStatus::OutStorageInspect,
    ];

    /// Return the database status ID.
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Parse a database status ID.
    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Wire name, as used in JSON payloads and query strings.
    pub fn name(self) -> &'static str {
        match self {
            ReserveStatus::Draft => "draft",
            ReserveStatus::EnteredDb => "entered_db",
            ReserveStatus::EarlyPlan => "early_plan",
            ReserveStatus::OutStorageInspect => "out_storage_inspect",
        }
    }

    /// The only status reachable from `self`, or `None` for the terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            ReserveStatus::Draft => Some(ReserveStatus::EnteredDb),
            ReserveStatus::EnteredDb => Some(ReserveStatus::EarlyPlan),
            ReserveStatus::EarlyPlan => Some(ReserveStatus::OutStorageInspect),
            ReserveStatus::OutStorageInspect => None,
        }
    }

    /// Check whether moving from `self` to `to` is a single forward step.
    pub fn can_transition(self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

impl fmt::Display for ReserveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReserveStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.name() == s)
            .ok_or_else(|| {
                CoreError::InvalidArgument(format!(
                    "Unknown status '{s}'. Must be one of: draft, entered_db, early_plan, out_storage_inspect"
                ))
            })
    }
}

/// The named lifecycle transitions exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `Draft -> EnteredDb`. Not window-gated.
    Refer,
    /// `EnteredDb -> EarlyPlan`. Window-gated.
    Submission,
    /// `EarlyPlan -> OutStorageInspect`. Window-gated.
    OutStorage,
}

impl Transition {
    /// Status the record must be in.
    pub fn from_status(self) -> ReserveStatus {
        match self {
            Transition::Refer => ReserveStatus::Draft,
            Transition::Submission => ReserveStatus::EnteredDb,
            Transition::OutStorage => ReserveStatus::EarlyPlan,
        }
    }

    /// Status the record ends up in.
    pub fn to_status(self) -> ReserveStatus {
        match self {
            Transition::Refer => ReserveStatus::EnteredDb,
            Transition::Submission => ReserveStatus::EarlyPlan,
            Transition::OutStorage => ReserveStatus::OutStorageInspect,
        }
    }

    /// Whether the transition may only be requested while a window is open.
    pub fn is_gated(self) -> bool {
        !matches!(self, Transition::Refer)
    }

    pub fn name(self) -> &'static str {
        match self {
            Transition::Refer => "refer",
            Transition::Submission => "submission",
            Transition::OutStorage => "out_storage",
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A reserve project record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveProject {
    pub id: DbId,
    pub name: String,
    pub level: String,
    pub project_type: String,
    pub construct_subject: String,
    pub status: ReserveStatus,
    pub site_photo: Option<String>,
    pub upload_cad_id: Option<String>,
    pub is_case_finish: bool,
    pub is_research: bool,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ReserveProject {
    /// Current artifact references of this record.
    pub fn artifact_refs(&self) -> ArtifactRefs {
        ArtifactRefs {
            site_photo: self.site_photo.clone(),
            upload_cad_id: self.upload_cad_id.clone(),
        }
    }
}

/// Artifact slots a reserve project can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSlot {
    SitePhoto,
    UploadCad,
}

impl ArtifactSlot {
    pub const ALL: [ArtifactSlot; 2] = [ArtifactSlot::SitePhoto, ArtifactSlot::UploadCad];

    pub fn name(self) -> &'static str {
        match self {
            ArtifactSlot::SitePhoto => "site_photo",
            ArtifactSlot::UploadCad => "upload_cad_id",
        }
    }
}

/// The artifact references held by one record, one per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactRefs {
    pub site_photo: Option<String>,
    pub upload_cad_id: Option<String>,
}

impl ArtifactRefs {
    /// The reference in `slot`, treating an empty string as no reference.
    pub fn get(&self, slot: ArtifactSlot) -> Option<&str> {
        let value = match slot {
            ArtifactSlot::SitePhoto => self.site_photo.as_deref(),
            ArtifactSlot::UploadCad => self.upload_cad_id.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Non-empty references paired with their slot.
    pub fn present(&self) -> impl Iterator<Item = (ArtifactSlot, &str)> + '_ {
        ArtifactSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|id| (slot, id)))
    }

    /// Whether any slot references `object_id`.
    pub fn holds(&self, object_id: &str) -> bool {
        self.present().any(|(_, id)| id == object_id)
    }

    /// References in `self` that `old` holds in no slot, each id once.
    pub fn introduced<'s>(
        &'s self,
        old: &'s ArtifactRefs,
    ) -> impl Iterator<Item = (ArtifactSlot, &'s str)> + 's {
        self.distinct().filter(move |(_, id)| !old.holds(id))
    }

    /// Present references with a repeated id reported once, under its
    /// first slot.
    pub fn distinct(&self) -> impl Iterator<Item = (ArtifactSlot, &str)> + '_ {
        self.present().filter(move |&(slot, id)| {
            self.present()
                .find(|&(_, other)| other == id)
                .is_some_and(|(first, _)| first == slot)
        })
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Fields supplied when creating a reserve project.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReserve {
    pub name: String,
    pub level: String,
    pub project_type: String,
    pub construct_subject: String,
    pub site_photo: Option<String>,
    pub upload_cad_id: Option<String>,
}

impl NewReserve {
    /// Validate descriptive fields and normalize empty references to `None`.
    pub fn validate(mut self) -> Result<Self, CoreError> {
        self.name = validate_text("name", &self.name)?;
        self.level = validate_text("level", &self.level)?;
        self.project_type = validate_text("project_type", &self.project_type)?;
        self.construct_subject = validate_text("construct_subject", &self.construct_subject)?;
        self.site_photo = normalize_ref(self.site_photo);
        self.upload_cad_id = normalize_ref(self.upload_cad_id);
        Ok(self)
    }

    pub fn artifact_refs(&self) -> ArtifactRefs {
        ArtifactRefs {
            site_photo: self.site_photo.clone(),
            upload_cad_id: self.upload_cad_id.clone(),
        }
    }
}

/// Partial update of a reserve project.
///
/// Descriptive fields are replaced when present. Artifact slots distinguish
/// three cases: absent (unchanged), `null` or `""` (cleared), and a value
/// (replaced).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservePatch {
    pub name: Option<String>,
    pub level: Option<String>,
    pub project_type: Option<String>,
    pub construct_subject: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub site_photo: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub upload_cad_id: Option<Option<String>>,
}

impl ReservePatch {
    /// Validate present fields and normalize empty references to a clear.
    pub fn validate(mut self) -> Result<Self, CoreError> {
        self.name = self.name.map(|v| validate_text("name", &v)).transpose()?;
        self.level = self.level.map(|v| validate_text("level", &v)).transpose()?;
        self.project_type = self
            .project_type
            .map(|v| validate_text("project_type", &v))
            .transpose()?;
        self.construct_subject = self
            .construct_subject
            .map(|v| validate_text("construct_subject", &v))
            .transpose()?;
        self.site_photo = self.site_photo.map(normalize_ref);
        self.upload_cad_id = self.upload_cad_id.map(normalize_ref);
        Ok(self)
    }

    /// Build the record that results from applying this patch to `current`.
    ///
    /// Status, flags and creation provenance are never touched.
    pub fn apply(&self, current: &ReserveProject, actor: &str) -> ReserveProject {
        let mut next = current.clone();
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(level) = &self.level {
            next.level = level.clone();
        }
        if let Some(project_type) = &self.project_type {
            next.project_type = project_type.clone();
        }
        if let Some(construct_subject) = &self.construct_subject {
            next.construct_subject = construct_subject.clone();
        }
        if let Some(site_photo) = &self.site_photo {
            next.site_photo = site_photo.clone();
        }
        if let Some(upload_cad_id) = &self.upload_cad_id {
            next.upload_cad_id = upload_cad_id.clone();
        }
        next.updated_by = actor.to_string();
        next
    }
}

/// Flags captured by the gated transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TransitionFlags {
    #[serde(default)]
    pub is_case_finish: bool,
    #[serde(default)]
    pub is_research: bool,
}

/// Attribute filter for listing reserve projects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReserveFilter {
    /// Case-insensitive substring match on `name`.
    pub name: Option<String>,
    pub level: Option<String>,
    pub project_type: Option<String>,
    pub construct_subject: Option<String>,
    pub status: Option<ReserveStatus>,
}

impl ReserveFilter {
    /// Check whether `record` satisfies every present criterion.
    pub fn matches(&self, record: &ReserveProject) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |needle| {
            record
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        name_ok
            && self.level.as_deref().map_or(true, |v| record.level == v)
            && self
                .project_type
                .as_deref()
                .map_or(true, |v| record.project_type == v)
            && self
                .construct_subject
                .as_deref()
                .map_or(true, |v| record.construct_subject == v)
            && self.status.map_or(true, |s| record.status == s)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_text(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument(format!(
            "Field '{field}' must not be empty"
        )));
    }
    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(CoreError::InvalidArgument(format!(
            "Field '{field}' exceeds {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_ref(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Deserialize a field as `Some(value)` whenever it is present, so that an
/// explicit `null` becomes `Some(None)` while an absent field stays `None`
/// (via `#[serde(default)]`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
