//! Capability classification: elevated vs restricted.
//!
//! No single catalog check is portable across instance configurations, so
//! the tier is decided by a fixed battery of independent probes and a
//! majority rule. The threshold (passing probes >= half the battery) is
//! calibrated against downstream estimates; do not tune it.

use tracing::{debug, info};

use crate::config::{CapabilityOverride, ConnectionProfile};
use crate::model::CapabilityTier;
use crate::source::SourceConnection;

/// One boolean capability probe. Passes when the first column of the
/// first row is positive; any error counts as a failed probe.
pub struct Probe {
    pub label: &'static str,
    pub sql: &'static str,
}

/// The reference probe battery.
pub const PROBES: &[Probe] = &[
    Probe {
        label: "elevated role active",
        sql: "SELECT COUNT(*) FROM session_roles WHERE role = 'DBA'",
    },
    Probe {
        label: "elevated catalog readable",
        sql: "SELECT COUNT(*) FROM dba_users WHERE rownum = 1",
    },
    Probe {
        label: "administrative identity",
        sql: "SELECT CASE WHEN USER IN ('SYS', 'SYSTEM') THEN 1 ELSE 0 END FROM DUAL",
    },
    Probe {
        label: "blanket read privilege",
        sql: "SELECT COUNT(*) FROM session_privs WHERE privilege = 'SELECT ANY TABLE'",
    },
];

/// Pure majority rule over probe outcomes: elevated iff the number of
/// passing probes is at least half the battery (ceil(total/2)).
pub fn tier_from_outcomes(outcomes: &[bool]) -> CapabilityTier {
    let passed = outcomes.iter().filter(|&&p| p).count();
    if passed * 2 >= outcomes.len() && !outcomes.is_empty() {
        CapabilityTier::Elevated
    } else {
        CapabilityTier::Restricted
    }
}

/// Classify one connection for this run.
///
/// An explicit override in the profile wins without touching the
/// instance; otherwise the battery runs and the majority rule decides.
pub fn classify(conn: &dyn SourceConnection, profile: &ConnectionProfile) -> CapabilityTier {
    if let CapabilityOverride::Explicit(elevated) = profile.elevated {
        let tier = if elevated {
            CapabilityTier::Elevated
        } else {
            CapabilityTier::Restricted
        };
        info!(profile = %profile.name, %tier, "capability pinned by configuration");
        return tier;
    }

    let outcomes: Vec<bool> = PROBES
        .iter()
        .map(|probe| {
            let passed = match conn.query(probe.sql, &[]) {
                Ok(rows) => rows.first().map(|r| r.int(0) > 0).unwrap_or(false),
                Err(err) => {
                    debug!(probe = probe.label, %err, "probe errored, scored as failed");
                    false
                }
            };
            debug!(probe = probe.label, passed, "capability probe");
            passed
        })
        .collect();

    let tier = tier_from_outcomes(&outcomes);
    let passed = outcomes.iter().filter(|&&p| p).count();
    info!(
        profile = %profile.name,
        score = format!("{}/{}", passed, outcomes.len()),
        %tier,
        "capability classified"
    );
    tier
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use crate::source::{Params, Row, SqlValue};

    /// Fake source where each probe either errors or returns a count.
    struct ProbeSource {
        counts: Vec<Result<i64, ()>>,
    }

    impl SourceConnection for ProbeSource {
        fn current_user(&self) -> Result<String> {
            Ok("TESTER".to_string())
        }

        fn query(&self, sql: &str, _params: Params) -> Result<Vec<Row>> {
            let idx = PROBES
                .iter()
                .position(|p| p.sql == sql)
                .ok_or_else(|| anyhow!("unexpected query: {sql}"))?;
            match self.counts[idx] {
                Ok(count) => Ok(vec![Row::new(vec![SqlValue::Int(count)])]),
                Err(()) => Err(anyhow!("simulated privilege error")),
            }
        }
    }

    fn profile(elevated: CapabilityOverride) -> ConnectionProfile {
        ConnectionProfile {
            name: "T".into(),
            address: Some("h:1521/S".into()),
            username: "TESTER".into(),
            password: "p".into(),
            description: None,
            target_schema: None,
            elevated,
            whole_instance: false,
        }
    }

    #[test]
    fn test_threshold_over_all_vectors() {
        // 0..=4 passing probes out of 4: elevated from 2 upward
        for passing in 0..=4usize {
            let outcomes: Vec<bool> = (0..4).map(|i| i < passing).collect();
            let expected = if passing >= 2 {
                CapabilityTier::Elevated
            } else {
                CapabilityTier::Restricted
            };
            assert_eq!(
                tier_from_outcomes(&outcomes),
                expected,
                "{} of 4 passing",
                passing
            );
        }
    }

    #[test]
    fn test_probe_errors_score_as_failed() {
        let conn = ProbeSource {
            counts: vec![Ok(1), Err(()), Err(()), Err(())],
        };
        let tier = classify(&conn, &profile(CapabilityOverride::Auto));
        assert_eq!(tier, CapabilityTier::Restricted);
    }

    #[test]
    fn test_two_passes_is_elevated() {
        let conn = ProbeSource {
            counts: vec![Ok(1), Ok(1), Ok(0), Err(())],
        };
        let tier = classify(&conn, &profile(CapabilityOverride::Auto));
        assert_eq!(tier, CapabilityTier::Elevated);
    }

    #[test]
    fn test_override_skips_probing() {
        // Every probe would panic the fake; the override must not reach it.
        struct NoQueries;
        impl SourceConnection for NoQueries {
            fn current_user(&self) -> Result<String> {
                Ok("TESTER".to_string())
            }
            fn query(&self, _sql: &str, _params: Params) -> Result<Vec<Row>> {
                panic!("probe executed despite explicit override");
            }
        }
        let tier = classify(&NoQueries, &profile(CapabilityOverride::Explicit(false)));
        assert_eq!(tier, CapabilityTier::Restricted);
        let tier = classify(&NoQueries, &profile(CapabilityOverride::Explicit(true)));
        assert_eq!(tier, CapabilityTier::Elevated);
    }
}
