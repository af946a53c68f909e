//! Typed permission predicates.
//!
//! Conditions are a closed enum evaluated by exhaustive `match`, so a stored
//! condition can never silently no-op. Evaluation is fail-closed: when a
//! condition needs a context datum that the caller did not supply, it
//! evaluates to `false`.

use std::net::IpAddr;

use chrono::{DateTime, Timelike, Utc};
use clavis_core::{AppError, AppResult};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Caller-supplied request context consulted by scopes and conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckContext {
    /// Owner of the resource under check, when known.
    pub owner_id: Option<UserId>,
    /// Team the resource belongs to, when known.
    pub team_id: Option<String>,
    /// Organization the resource belongs to, when known.
    pub organization_id: Option<String>,
    /// Client address the request originated from.
    pub client_ip: Option<IpAddr>,
}

/// A predicate attached to a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessCondition {
    /// Unconditionally satisfied.
    Always,
    /// Satisfied during `[start_hour, end_hour)` UTC. A window whose start is
    /// later than its end wraps past midnight; equal bounds mean the full day.
    TimeWindow {
        /// Inclusive start hour, `0..=23`.
        start_hour: u8,
        /// Exclusive end hour, `0..=23`.
        end_hour: u8,
    },
    /// Satisfied when the request's client address falls inside the network.
    IpRange {
        /// Allowed CIDR network.
        cidr: IpNet,
    },
}

impl AccessCondition {
    /// Checks structural validity of the predicate.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Self::Always | Self::IpRange { .. } => Ok(()),
            Self::TimeWindow {
                start_hour,
                end_hour,
            } => {
                if *start_hour > 23 || *end_hour > 23 {
                    return Err(AppError::Validation(format!(
                        "time window hours must be within 0..=23, got {start_hour}..{end_hour}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Evaluates the predicate against the request context at `now`.
    #[must_use]
    pub fn evaluate(&self, context: Option<&CheckContext>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Always => true,
            Self::TimeWindow {
                start_hour,
                end_hour,
            } => {
                let hour = now.hour() as u8;
                if start_hour == end_hour {
                    true
                } else if start_hour < end_hour {
                    (*start_hour..*end_hour).contains(&hour)
                } else {
                    hour >= *start_hour || hour < *end_hour
                }
            }
            Self::IpRange { cidr } => context
                .and_then(|context| context.client_ip)
                .is_some_and(|client_ip| cidr.contains(&client_ip)),
        }
    }
}
