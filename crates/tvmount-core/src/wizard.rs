//! # Booking Wizard
//!
//! A linear form wizard over N independent TV configurations.
//!
//! ```text
//! TV 1: Photo → TvSize → ServiceTier → Mounting → AddOns ─┐
//! TV 2: Photo → TvSize → ServiceTier → Mounting → AddOns ─┤  (one pass per TV)
//!   …                                                     │
//!       Schedule ← ───────────────────────────────────────┘
//!       → Contact → Review
//! ```
//!
//! The state is an array of per-TV drafts, a TV cursor and a step. `next()`
//! only moves forward when the current step's required fields are present
//! and valid; `back()` always moves backward (and is a no-op on the first
//! step).
//!
//! The wizard never touches storage. Photo references are checked by the
//! caller before input reaches [`Wizard::apply`].

use crate::booking::BookingRequest;
use crate::catalog::Catalog;
use crate::pricing::TvConfig;
use crate::primitives::MAX_TVS_PER_BOOKING;
use crate::validation;
use crate::{Contact, MarketError, PhotoId, Schedule, Step, TimeSlot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// TV DRAFT
// =============================================================================

/// A TV configuration under construction; every field may still be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TvDraft {
    pub photo: Option<PhotoId>,
    pub size_inches: Option<u16>,
    pub tier: Option<String>,
    pub wall_type: Option<String>,
    pub mount_type: Option<String>,
    pub addons: Vec<String>,
}

impl TvDraft {
    /// Convert to a full configuration once every required field is set.
    #[must_use]
    pub fn to_config(&self) -> Option<TvConfig> {
        Some(TvConfig {
            size_inches: self.size_inches?,
            tier: self.tier.clone()?,
            wall_type: self.wall_type.clone()?,
            mount_type: self.mount_type.clone()?,
            addons: self.addons.clone(),
            photo: self.photo.clone(),
        })
    }
}

// =============================================================================
// STEP INPUT
// =============================================================================

/// The fields one wizard step edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepInput {
    Photo {
        #[serde(default)]
        photo: Option<PhotoId>,
    },
    TvSize {
        size_inches: u16,
    },
    ServiceTier {
        tier: String,
    },
    Mounting {
        wall_type: String,
        mount_type: String,
    },
    AddOns {
        #[serde(default)]
        addons: Vec<String>,
    },
    Schedule {
        date: NaiveDate,
        slot: TimeSlot,
    },
    Contact {
        name: String,
        email: String,
        phone: String,
        address: String,
    },
    Review {
        #[serde(default)]
        notes: String,
    },
}

impl StepInput {
    /// The step this input belongs to.
    #[must_use]
    pub fn step(&self) -> Step {
        match self {
            Self::Photo { .. } => Step::Photo,
            Self::TvSize { .. } => Step::TvSize,
            Self::ServiceTier { .. } => Step::ServiceTier,
            Self::Mounting { .. } => Step::Mounting,
            Self::AddOns { .. } => Step::AddOns,
            Self::Schedule { .. } => Step::Schedule,
            Self::Contact { .. } => Step::Contact,
            Self::Review { .. } => Step::Review,
        }
    }
}

// =============================================================================
// WIZARD
// =============================================================================

/// The multi-TV booking wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wizard {
    tvs: Vec<TvDraft>,
    current_tv: usize,
    step: Step,
    schedule: Option<Schedule>,
    contact: Option<Contact>,
    notes: String,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    /// A fresh wizard with one empty TV, on the first step.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tvs: vec![TvDraft::default()],
            current_tv: 0,
            step: Step::Photo,
            schedule: None,
            contact: None,
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub fn current_tv(&self) -> usize {
        self.current_tv
    }

    #[must_use]
    pub fn tvs(&self) -> &[TvDraft] {
        &self.tvs
    }

    #[must_use]
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    #[must_use]
    pub fn contact(&self) -> Option<&Contact> {
        self.contact.as_ref()
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Completion estimate for a progress bar, 0 to 100.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let per_tv = Step::PER_TV.len();
        let total = self.tvs.len() * per_tv + 3;
        let position = if self.step.is_per_tv() {
            self.current_tv * per_tv + self.step.ordinal()
        } else {
            self.tvs.len() * per_tv + self.step.ordinal()
        };
        ((position * 100) / (total - 1)).min(100) as u8
    }

    fn tv_mut(&mut self) -> &mut TvDraft {
        // current_tv is kept < tvs.len() and tvs is never empty
        let index = self.current_tv.min(self.tvs.len().saturating_sub(1));
        &mut self.tvs[index]
    }

    // =========================================================================
    // EDITING
    // =========================================================================

    /// Store input for the current step.
    ///
    /// Values are validated on the way in; on error the wizard is unchanged.
    pub fn apply(&mut self, input: StepInput, catalog: &Catalog) -> Result<(), MarketError> {
        let requested = input.step();
        if requested != self.step {
            return Err(MarketError::WrongStep {
                current: self.step,
                requested,
            });
        }

        match input {
            StepInput::Photo { photo } => self.tv_mut().photo = photo,
            StepInput::TvSize { size_inches } => {
                validation::tv_size(size_inches)?;
                self.tv_mut().size_inches = Some(size_inches);
            }
            StepInput::ServiceTier { tier } => {
                catalog.tier(&tier)?;
                self.tv_mut().tier = Some(tier);
            }
            StepInput::Mounting {
                wall_type,
                mount_type,
            } => {
                validation::mounting(catalog, &wall_type, &mount_type)?;
                let tv = self.tv_mut();
                tv.wall_type = Some(wall_type);
                tv.mount_type = Some(mount_type);
            }
            StepInput::AddOns { addons } => {
                validation::addons(catalog, &addons)?;
                self.tv_mut().addons = addons;
            }
            StepInput::Schedule { date, slot } => {
                self.schedule = Some(Schedule { date, slot });
            }
            StepInput::Contact {
                name,
                email,
                phone,
                address,
            } => {
                self.contact = Some(
                    Contact {
                        name,
                        email,
                        phone,
                        address,
                    }
                    .trimmed(),
                );
            }
            StepInput::Review { notes } => {
                validation::notes(&notes)?;
                self.notes = notes;
            }
        }
        Ok(())
    }

    /// Check the required fields of `step` (for the TV at `tv`).
    fn check(
        &self,
        step: Step,
        tv: usize,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<(), MarketError> {
        let incomplete = || MarketError::IncompleteStep(step);
        let draft = self.tvs.get(tv).ok_or_else(incomplete)?;

        match step {
            Step::Photo => {}
            Step::AddOns => {
                validation::addons(catalog, &draft.addons)?;
            }
            Step::TvSize => {
                validation::tv_size(draft.size_inches.ok_or_else(incomplete)?)?;
            }
            Step::ServiceTier => {
                let size = draft
                    .size_inches
                    .ok_or(MarketError::IncompleteStep(Step::TvSize))?;
                let tier = draft.tier.as_deref().ok_or_else(incomplete)?;
                validation::tier_for_size(catalog, tier, size)?;
            }
            Step::Mounting => {
                let wall = draft.wall_type.as_deref().ok_or_else(incomplete)?;
                let mount = draft.mount_type.as_deref().ok_or_else(incomplete)?;
                validation::mounting(catalog, wall, mount)?;
            }
            Step::Schedule => {
                validation::schedule(self.schedule.as_ref().ok_or_else(incomplete)?, today)?;
            }
            Step::Contact => {
                validation::contact(self.contact.as_ref().ok_or_else(incomplete)?)?;
            }
            Step::Review => {
                self.to_request().ok_or_else(incomplete)?.validate(catalog, today)?;
            }
        }
        Ok(())
    }

    /// Whether the current step's required fields are present and valid.
    #[must_use]
    pub fn can_advance(&self, catalog: &Catalog, today: NaiveDate) -> bool {
        self.check(self.step, self.current_tv, catalog, today).is_ok()
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Advance one step if the current one is complete.
    ///
    /// On `Review` this is a no-op; use [`Wizard::finish`].
    pub fn next(&mut self, catalog: &Catalog, today: NaiveDate) -> Result<Step, MarketError> {
        self.check(self.step, self.current_tv, catalog, today)?;

        self.step = match self.step {
            Step::Photo => Step::TvSize,
            Step::TvSize => Step::ServiceTier,
            Step::ServiceTier => Step::Mounting,
            Step::Mounting => Step::AddOns,
            Step::AddOns if self.current_tv + 1 < self.tvs.len() => {
                self.current_tv += 1;
                Step::Photo
            }
            Step::AddOns => Step::Schedule,
            Step::Schedule => Step::Contact,
            Step::Contact | Step::Review => Step::Review,
        };
        Ok(self.step)
    }

    /// Go back one step. Never fails; the first step stays put.
    pub fn back(&mut self) -> Step {
        self.step = match self.step {
            Step::Photo if self.current_tv > 0 => {
                self.current_tv -= 1;
                Step::AddOns
            }
            Step::Photo => Step::Photo,
            Step::TvSize => Step::Photo,
            Step::ServiceTier => Step::TvSize,
            Step::Mounting => Step::ServiceTier,
            Step::AddOns => Step::Mounting,
            Step::Schedule => {
                self.current_tv = self.tvs.len() - 1;
                Step::AddOns
            }
            Step::Contact => Step::Schedule,
            Step::Review => Step::Contact,
        };
        self.step
    }

    /// Append a TV and jump to its first step.
    pub fn add_tv(&mut self) -> Result<usize, MarketError> {
        if self.tvs.len() >= MAX_TVS_PER_BOOKING {
            return Err(MarketError::invalid(format!(
                "A booking holds at most {MAX_TVS_PER_BOOKING} TVs"
            )));
        }
        self.tvs.push(TvDraft::default());
        self.current_tv = self.tvs.len() - 1;
        self.step = Step::Photo;
        Ok(self.current_tv)
    }

    /// Remove a TV. The last remaining TV cannot be removed.
    pub fn remove_tv(&mut self, index: usize) -> Result<(), MarketError> {
        if index >= self.tvs.len() {
            return Err(MarketError::invalid(format!("No TV at position {index}")));
        }
        if self.tvs.len() == 1 {
            return Err(MarketError::invalid("A booking needs at least one TV"));
        }
        self.tvs.remove(index);

        if self.step.is_per_tv() {
            if self.current_tv == index {
                self.current_tv = index.min(self.tvs.len() - 1);
                self.step = Step::Photo;
            } else if self.current_tv > index {
                self.current_tv -= 1;
            }
        } else {
            self.current_tv = self.tvs.len() - 1;
        }
        Ok(())
    }

    // =========================================================================
    // COMPLETION
    // =========================================================================

    fn to_request(&self) -> Option<BookingRequest> {
        let tvs = self
            .tvs
            .iter()
            .map(TvDraft::to_config)
            .collect::<Option<Vec<_>>>()?;
        Some(BookingRequest {
            tvs,
            schedule: self.schedule?,
            contact: self.contact.clone()?,
            notes: self.notes.clone(),
        })
    }

    /// Produce the booking request. Only allowed from `Review`, and only when
    /// every step of every TV is valid.
    pub fn finish(&self, catalog: &Catalog, today: NaiveDate) -> Result<BookingRequest, MarketError> {
        if self.step != Step::Review {
            return Err(MarketError::WrongStep {
                current: self.step,
                requested: Step::Review,
            });
        }
        let request = self
            .to_request()
            .ok_or(MarketError::IncompleteStep(Step::Review))?;
        request.validate(catalog, today)?;
        Ok(request)
    }
}

// =============================================================================
// TESTS
// =============================================================================
