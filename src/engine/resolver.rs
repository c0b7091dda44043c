use std::sync::Arc;

use tracing::debug;

use crate::{
    config::Policy,
    qso::FieldValue,
    types::FieldClass,
};

/// Outcome of reconciling one field of a duplicate with the primary.
///
/// Every variant except [`Resolution::Unresolved`] consumes the duplicate's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Primary keeps its value.
    KeepPrimary,
    /// Primary takes the duplicate's value.
    Adopt,
    /// Values conflict; the duplicate's value becomes residue.
    Unresolved,
    /// Internal metadata, neither merged nor reported.
    Skip,
}

/// Field-by-field merge policy.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    policy: Arc<Policy>,
}

impl ConflictResolver {
    /// Creates a resolver applying `policy`.
    pub fn new(policy: Arc<Policy>) -> Self {
        Self { policy }
    }

    /// Decides what happens to `candidate`, the duplicate's value of `field`.
    ///
    /// A trusted-source override is checked before the field's class rule and
    /// always adopts the duplicate's value.
    pub fn resolve(
        &self,
        field: &str,
        primary: Option<&FieldValue>,
        candidate: &FieldValue,
        candidate_source: &str,
    ) -> Resolution {
        if self.policy.is_internal(field) {
            return Resolution::Skip;
        }
        let Some(primary) = primary else {
            return Resolution::Adopt;
        };
        if primary == candidate {
            return Resolution::KeepPrimary;
        }
        if let Some(trusted) = self.policy.override_source(candidate_source, field) {
            debug!(field, source = candidate_source, trusted, "trusted source overrides");
            return Resolution::Adopt;
        }

        match self.policy.class(field) {
            FieldClass::FreeText => free_text(&primary.to_string(), &candidate.to_string()),
            FieldClass::Precision => precision(&primary.to_string(), &candidate.to_string()),
            FieldClass::Distance => {
                let cfg = self.policy.config();
                within_tolerance(primary, candidate, |diff, larger| {
                    diff < cfg.distance_abs_tolerance
                        || (larger > 0.0 && diff / larger < cfg.distance_rel_tolerance)
                })
            }
            FieldClass::Frequency => {
                let tolerance = self.policy.config().freq_tolerance;
                within_tolerance(primary, candidate, |diff, _| diff < tolerance)
            }
            FieldClass::Confirmation => {
                if self.policy.is_pending_qsl(&primary.to_string())
                    && self.policy.is_confirmed_qsl(&candidate.to_string())
                {
                    Resolution::Adopt
                } else {
                    Resolution::KeepPrimary
                }
            }
            FieldClass::SignalReport => self.signal_report(&primary.to_string(), &candidate.to_string()),
            FieldClass::OmittableCode => {
                if primary.is_unset() && !candidate.is_unset() {
                    Resolution::Adopt
                } else {
                    Resolution::Unresolved
                }
            }
            FieldClass::Generic => Resolution::Unresolved,
        }
    }

    // A three digit report is what non-digital loggers fill in by default.
    // Only that default gives way; a default arriving late stays as residue.
    fn signal_report(&self, primary: &str, candidate: &str) -> Resolution {
        if self.policy.legacy_report.is_match(primary) && self.policy.digital_report.is_match(candidate) {
            Resolution::Adopt
        } else {
            Resolution::Unresolved
        }
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn all_upper(s: &str) -> bool {
    s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_lowercase)
}

fn free_text(primary: &str, candidate: &str) -> Resolution {
    let (p, c) = (fold(primary), fold(candidate));
    if p == c {
        let (plen, clen) = (primary.chars().count(), candidate.chars().count());
        if clen > plen || (clen == plen && all_upper(primary) && !all_upper(candidate)) {
            Resolution::Adopt
        } else {
            Resolution::KeepPrimary
        }
    } else if p.contains(&c) {
        Resolution::KeepPrimary
    } else if c.contains(&p) {
        Resolution::Adopt
    } else {
        Resolution::Unresolved
    }
}

fn precision(primary: &str, candidate: &str) -> Resolution {
    if primary.is_empty() {
        return Resolution::Adopt;
    }
    if candidate.is_empty() {
        return Resolution::KeepPrimary;
    }
    let head = |s: &str| s.chars().take(4).collect::<String>();
    if head(primary) != head(candidate) {
        return Resolution::Unresolved;
    }
    if candidate.chars().count() > primary.chars().count() {
        Resolution::Adopt
    } else {
        Resolution::KeepPrimary
    }
}

fn within_tolerance(
    primary: &FieldValue,
    candidate: &FieldValue,
    close: impl Fn(f64, f64) -> bool,
) -> Resolution {
    let (Some(p), Some(c)) = (primary.as_f64(), candidate.as_f64()) else {
        return Resolution::Unresolved;
    };
    if !close((p - c).abs(), p.max(c)) {
        return Resolution::Unresolved;
    }
    if c > p {
        Resolution::Adopt
    } else {
        Resolution::KeepPrimary
    }
}
