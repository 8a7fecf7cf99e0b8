//! Response status and failure-info classifications
//!
//! The fixed status and `PKIFailureInfo` sets a compliant TSA produces
//! according to RFC 3161 Section 2.4.2.

use serde::{Deserialize, Serialize};

/// PKI status values of a time-stamp response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// Granted
    Granted,
    /// Granted with modifications
    GrantedWithMods,
    /// Rejection
    Rejection,
    /// Waiting
    Waiting,
    /// Revocation warning
    RevocationWarning,
    /// Revocation notification
    RevocationNotification,
}

impl ResponseStatus {
    /// The integer representation defined by `PKIStatus`
    pub fn value(self) -> u8 {
        match self {
            ResponseStatus::Granted => 0,
            ResponseStatus::GrantedWithMods => 1,
            ResponseStatus::Rejection => 2,
            ResponseStatus::Waiting => 3,
            ResponseStatus::RevocationWarning => 4,
            ResponseStatus::RevocationNotification => 5,
        }
    }

    /// Look up the status for its `PKIStatus` integer value
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(ResponseStatus::Granted),
            1 => Some(ResponseStatus::GrantedWithMods),
            2 => Some(ResponseStatus::Rejection),
            3 => Some(ResponseStatus::Waiting),
            4 => Some(ResponseStatus::RevocationWarning),
            5 => Some(ResponseStatus::RevocationNotification),
            _ => None,
        }
    }

    /// Whether this status carries a time-stamp token
    pub fn is_granted(self) -> bool {
        matches!(self, ResponseStatus::Granted | ResponseStatus::GrantedWithMods)
    }
}

/// `PKIFailureInfo` values accompanying a non-granted response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureInfo {
    /// Unrecognized or unsupported algorithm identifier
    BadAlgorithm,
    /// Transaction not permitted or supported
    BadRequest,
    /// Data submitted has the wrong format
    BadDataFormat,
    /// The TSA's time source is not available
    TimeNotAvailable,
    /// The requested policy is not supported
    UnacceptedPolicy,
    /// The requested extension is not supported
    UnacceptedExtension,
    /// The additional information requested could not be understood
    AddInfoNotAvailable,
    /// The request cannot be handled due to system failure
    SystemFailure,
}

impl FailureInfo {
    /// Every defined failure info value.
    pub const ALL: [FailureInfo; 8] = [
        FailureInfo::BadAlgorithm,
        FailureInfo::BadRequest,
        FailureInfo::BadDataFormat,
        FailureInfo::TimeNotAvailable,
        FailureInfo::UnacceptedPolicy,
        FailureInfo::UnacceptedExtension,
        FailureInfo::AddInfoNotAvailable,
        FailureInfo::SystemFailure,
    ];

    /// The BIT STRING bit position defined by RFC 3161
    pub fn bit_position(self) -> u32 {
        match self {
            FailureInfo::BadAlgorithm => 0,
            FailureInfo::BadRequest => 2,
            FailureInfo::BadDataFormat => 5,
            FailureInfo::TimeNotAvailable => 14,
            FailureInfo::UnacceptedPolicy => 15,
            FailureInfo::UnacceptedExtension => 16,
            FailureInfo::AddInfoNotAvailable => 17,
            FailureInfo::SystemFailure => 25,
        }
    }

    /// Look up the failure info for a BIT STRING bit position
    pub fn from_bit_position(bit: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|info| info.bit_position() == bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_value_round_trip() {
        for value in 0..=5 {
            let status = ResponseStatus::from_value(value).unwrap();
            assert_eq!(status.value(), value);
        }
        assert_eq!(ResponseStatus::from_value(6), None);
    }

    #[test]
    fn test_granted_statuses() {
        assert!(ResponseStatus::Granted.is_granted());
        assert!(ResponseStatus::GrantedWithMods.is_granted());
        assert!(!ResponseStatus::Rejection.is_granted());
    }

    #[test]
    fn test_failure_info_bit_round_trip() {
        for info in FailureInfo::ALL {
            assert_eq!(FailureInfo::from_bit_position(info.bit_position()), Some(info));
        }
        assert_eq!(FailureInfo::from_bit_position(3), None);
    }
}
