//! Job envelope, policy, handle and record types.
//!
//! A job travels through the system as a [`JobEnvelope`] (type tag plus
//! opaque payload). The store hands back a [`JobHandle`] at enqueue time
//! and exposes the job's current state as a [`JobRecord`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::JobError;
use crate::types::{JobId, Timestamp};

/// State ID type matching the SMALLINT `state_id` column.
pub type StateId = i16;

macro_rules! define_state_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database state ID.
            pub fn id(self) -> StateId {
                self as StateId
            }

            /// Lowercase label used in logs and error messages.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Resolve a database state ID.
            pub fn from_id(id: StateId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StateId {
            fn from(value: $name) -> Self {
                value as StateId
            }
        }
    };
}

define_state_enum! {
    /// Lifecycle state of a queued job.
    JobState {
        /// Enqueued, never attempted.
        Pending = 1 => "pending",
        /// Claimed by a dispatcher and executing.
        Running = 2 => "running",
        /// Finished successfully; result present.
        Completed = 3 => "completed",
        /// Retry budget exhausted.
        Failed = 4 => "failed",
        /// Marked non-retryable by the handler (or no handler exists).
        Skipped = 5 => "skipped",
        /// Failed an attempt and is waiting for its next one.
        Retrying = 6 => "retrying",
    }
}

impl JobState {
    /// Terminal states are never left again; the record only awaits
    /// garbage collection.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Skipped)
    }

    /// States a dispatcher may claim from.
    pub fn is_claimable(self) -> bool {
        matches!(self, JobState::Pending | JobState::Retrying)
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Retry, timeout and retention policy attached to a job at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPolicy {
    /// How many times a failed attempt is re-queued before the job is
    /// marked failed. `0` means a single attempt.
    pub max_retry: u32,
    /// Upper bound on a single execution attempt.
    pub timeout: Duration,
    /// How long the record stays queryable after it reaches a terminal state.
    pub retention: Duration,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            max_retry: 25,
            timeout: Duration::from_secs(30 * 60),
            retention: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A typed request that can be carried by a [`JobEnvelope`].
pub trait JobKind: Serialize + DeserializeOwned {
    /// Type tag routed on by the dispatcher.
    const JOB_TYPE: &'static str;

    /// Policy used when neither the caller nor the deployment overrides it.
    fn default_policy() -> JobPolicy {
        JobPolicy::default()
    }
}

/// The serialized unit of work: a type tag and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEnvelope {
    pub job_type: String,
    pub payload: Vec<u8>,
}

impl JobEnvelope {
    /// Serialize `request` as JSON under its [`JobKind::JOB_TYPE`] tag.
    pub fn encode<K: JobKind>(request: &K) -> Result<Self, JobError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| JobError::Encoding(e.to_string()))?;
        Ok(Self {
            job_type: K::JOB_TYPE.to_string(),
            payload,
        })
    }

    /// Decode the payload back into its typed request.
    pub fn decode<K: JobKind>(&self) -> Result<K, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

// ---------------------------------------------------------------------------
// Handle / record
// ---------------------------------------------------------------------------

/// Returned by the store on enqueue; the only way to look the job up later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub queue: String,
    pub id: JobId,
}

/// The store's view of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub queue: String,
    pub job_type: String,
    pub state: JobState,
    /// Number of failed attempts so far.
    pub retried: u32,
    pub max_retry: u32,
    pub last_error: Option<String>,
    pub enqueued_at: Timestamp,
    /// Completion marker, stamped when the job enters a terminal state.
    pub completed_at: Option<Timestamp>,
    /// Handler output; present only once the job has completed.
    pub result: Option<Vec<u8>>,
}

impl JobRecord {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            queue: self.queue.clone(),
            id: self.id,
        }
    }
}

/// A job claimed by a dispatcher, carrying everything needed to run it.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: JobId,
    pub queue: String,
    pub envelope: JobEnvelope,
    pub policy: JobPolicy,
    /// Failed attempts before this one.
    pub retried: u32,
}

/// What the store did with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The job will run again no earlier than `retry_at`.
    Requeued { retry_at: Timestamp },
    /// The retry budget is exhausted; the job is now failed.
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Ping {
        n: u32,
    }

    impl JobKind for Ping {
        const JOB_TYPE: &'static str = "test:ping";
    }

    #[test]
    fn job_state_ids_match_seed_data() {
        assert_eq!(JobState::Pending.id(), 1);
        assert_eq!(JobState::Running.id(), 2);
        assert_eq!(JobState::Completed.id(), 3);
        assert_eq!(JobState::Failed.id(), 4);
        assert_eq!(JobState::Skipped.id(), 5);
        assert_eq!(JobState::Retrying.id(), 6);
    }

    #[test]
    fn state_round_trips_through_id() {
        for id in 1..=6 {
            let state = JobState::from_id(id).unwrap();
            assert_eq!(StateId::from(state), id);
        }
        assert_eq!(JobState::from_id(0), None);
        assert_eq!(JobState::from_id(7), None);
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Skipped.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Retrying.is_terminal());
    }

    #[test]
    fn envelope_carries_type_tag() {
        let env = JobEnvelope::encode(&Ping { n: 3 }).unwrap();
        assert_eq!(env.job_type, "test:ping");
        assert_eq!(env.payload, br#"{"n":3}"#);
        assert_eq!(env.decode::<Ping>().unwrap(), Ping { n: 3 });
    }
}
