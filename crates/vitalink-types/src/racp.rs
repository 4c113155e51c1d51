//! Record Access Control Point (RACP) commands and responses.
//!
//! The RACP characteristic (`0x2A52`) is how a collector asks a glucose meter
//! or blood-pressure monitor to replay its stored records. The collector
//! writes a command; the device streams the records on the measurement
//! characteristic and then indicates a response on the RACP characteristic.
//!
//! Only the response to "report stored records / all records" is classified
//! here: `[0x06, 0x00, 0x01, response_code]`.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RACP op codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum RacpOpCode {
    ReportStoredRecords = 0x01,
    DeleteStoredRecords = 0x02,
    AbortOperation = 0x03,
    ReportNumberOfStoredRecords = 0x04,
    NumberOfStoredRecordsResponse = 0x05,
    ResponseCode = 0x06,
}

/// RACP operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum RacpOperator {
    Null = 0x00,
    AllRecords = 0x01,
    LessThanOrEqualTo = 0x02,
    GreaterThanOrEqualTo = 0x03,
    WithinRange = 0x04,
    FirstRecord = 0x05,
    LastRecord = 0x06,
}

/// RACP response codes carried in the fourth byte of a response.
pub mod response_code {
    pub const SUCCESS: u8 = 0x01;
    pub const OP_CODE_NOT_SUPPORTED: u8 = 0x02;
    pub const INVALID_OPERATOR: u8 = 0x03;
    pub const OPERATOR_NOT_SUPPORTED: u8 = 0x04;
    pub const INVALID_OPERAND: u8 = 0x05;
    pub const NO_RECORDS_FOUND: u8 = 0x06;
    pub const ABORT_UNSUCCESSFUL: u8 = 0x07;
    pub const PROCEDURE_NOT_COMPLETED: u8 = 0x08;
    pub const OPERAND_NOT_SUPPORTED: u8 = 0x09;
}

/// A command written to the RACP characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RacpCommand {
    pub op_code: RacpOpCode,
    pub operator: RacpOperator,
}

impl RacpCommand {
    /// "Report stored records, all records": `[0x01, 0x01]`.
    #[must_use]
    pub const fn report_all_records() -> Self {
        Self {
            op_code: RacpOpCode::ReportStoredRecords,
            operator: RacpOperator::AllRecords,
        }
    }

    /// "Report number of stored records, all records": `[0x04, 0x01]`.
    #[must_use]
    pub const fn report_number_of_records() -> Self {
        Self {
            op_code: RacpOpCode::ReportNumberOfStoredRecords,
            operator: RacpOperator::AllRecords,
        }
    }

    /// "Abort operation": `[0x03, 0x00]`.
    #[must_use]
    pub const fn abort() -> Self {
        Self {
            op_code: RacpOpCode::AbortOperation,
            operator: RacpOperator::Null,
        }
    }

    /// Wire bytes for this command (no operand).
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 2] {
        [self.op_code as u8, self.operator as u8]
    }
}

/// Outcome of a "report stored records" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "code", rename_all = "snake_case"))]
pub enum RacpResponse {
    /// All records were sent.
    Success,
    /// The device holds no records.
    NoRecordsFound,
    /// The device aborted the transfer.
    NotCompleted,
    /// Any other response code.
    Unknown(u8),
    /// The buffer is not a response to "report stored records".
    InvalidPayloadStructure,
}

impl RacpResponse {
    /// Length of a response to "report stored records".
    pub const LENGTH: usize = 4;

    /// Classify a buffer received on the RACP characteristic.
    ///
    /// Only `[0x06, 0x00, 0x01, code]` is a valid response; anything else,
    /// including a correct prefix of the wrong length, is
    /// [`RacpResponse::InvalidPayloadStructure`].
    #[must_use]
    pub fn classify(bytes: &[u8]) -> Self {
        let [op_code, operator, request, code] = match bytes {
            [a, b, c, d] => [*a, *b, *c, *d],
            _ => return RacpResponse::InvalidPayloadStructure,
        };
        if op_code != RacpOpCode::ResponseCode as u8
            || operator != RacpOperator::Null as u8
            || request != RacpOpCode::ReportStoredRecords as u8
        {
            return RacpResponse::InvalidPayloadStructure;
        }
        match code {
            response_code::SUCCESS => RacpResponse::Success,
            response_code::NO_RECORDS_FOUND => RacpResponse::NoRecordsFound,
            response_code::PROCEDURE_NOT_COMPLETED => RacpResponse::NotCompleted,
            other => RacpResponse::Unknown(other),
        }
    }

    /// Numeric response code, or `None` when the payload was malformed.
    #[must_use]
    pub fn code(self) -> Option<u8> {
        match self {
            RacpResponse::Success => Some(response_code::SUCCESS),
            RacpResponse::NoRecordsFound => Some(response_code::NO_RECORDS_FOUND),
            RacpResponse::NotCompleted => Some(response_code::PROCEDURE_NOT_COMPLETED),
            RacpResponse::Unknown(code) => Some(code),
            RacpResponse::InvalidPayloadStructure => None,
        }
    }

    /// Whether the transfer finished and the collected records are complete.
    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(self, RacpResponse::Success | RacpResponse::NoRecordsFound)
    }
}

impl fmt::Display for RacpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RacpResponse::Success => write!(f, "success"),
            RacpResponse::NoRecordsFound => write!(f, "no records found"),
            RacpResponse::NotCompleted => write!(f, "procedure not completed"),
            RacpResponse::Unknown(code) => write!(f, "unknown response code 0x{:02X}", code),
            RacpResponse::InvalidPayloadStructure => write!(f, "invalid payload structure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_all_records_bytes() {
        assert_eq!(RacpCommand::report_all_records().to_bytes(), [0x01, 0x01]);
        assert_eq!(RacpCommand::report_number_of_records().to_bytes(), [0x04, 0x01]);
        assert_eq!(RacpCommand::abort().to_bytes(), [0x03, 0x00]);
    }

    #[test]
    fn test_classify_known_codes() {
        assert_eq!(RacpResponse::classify(&[0x06, 0x00, 0x01, 0x01]), RacpResponse::Success);
        assert_eq!(
            RacpResponse::classify(&[0x06, 0x00, 0x01, 0x06]),
            RacpResponse::NoRecordsFound
        );
        assert_eq!(
            RacpResponse::classify(&[0x06, 0x00, 0x01, 0x08]),
            RacpResponse::NotCompleted
        );
        assert_eq!(
            RacpResponse::classify(&[0x06, 0x00, 0x01, 0x05]),
            RacpResponse::Unknown(0x05)
        );
    }

    #[test]
    fn test_classify_wrong_length() {
        assert_eq!(
            RacpResponse::classify(&[0x01, 0x02, 0x03]),
            RacpResponse::InvalidPayloadStructure
        );
        assert_eq!(RacpResponse::classify(&[]), RacpResponse::InvalidPayloadStructure);
        assert_eq!(
            RacpResponse::classify(&[0x06, 0x00, 0x01, 0x01, 0x00]),
            RacpResponse::InvalidPayloadStructure
        );
    }

    #[test]
    fn test_classify_wrong_header() {
        // Number-of-records response, not a response code.
        assert_eq!(
            RacpResponse::classify(&[0x05, 0x00, 0x0A, 0x00]),
            RacpResponse::InvalidPayloadStructure
        );
        // Operator must be null.
        assert_eq!(
            RacpResponse::classify(&[0x06, 0x01, 0x01, 0x01]),
            RacpResponse::InvalidPayloadStructure
        );
        // Response to a delete request.
        assert_eq!(
            RacpResponse::classify(&[0x06, 0x00, 0x02, 0x01]),
            RacpResponse::InvalidPayloadStructure
        );
    }

    #[test]
    fn test_codes_and_completion() {
        assert_eq!(RacpResponse::NotCompleted.code(), Some(8));
        assert_eq!(RacpResponse::Unknown(0x42).code(), Some(0x42));
        assert_eq!(RacpResponse::InvalidPayloadStructure.code(), None);
        assert!(RacpResponse::Success.is_complete());
        assert!(RacpResponse::NoRecordsFound.is_complete());
        assert!(!RacpResponse::NotCompleted.is_complete());
        assert!(!RacpResponse::InvalidPayloadStructure.is_complete());
    }

    #[test]
    fn test_display() {
        assert_eq!(RacpResponse::Unknown(0x0A).to_string(), "unknown response code 0x0A");
        assert_eq!(RacpResponse::NotCompleted.to_string(), "procedure not completed");
    }
}
