//! Receipt error rendering

use crate::chain::{EventLog, Transaction};

/// Symbolic names of the node's transaction error codes, indexed by code
const TRANSACTION_ERRORS: [&str; 26] = [
    "CHECKER_FAILED",
    "RUNNER_FAILED",
    "BALANCE_TRANSFER_FAILED",
    "EXECUTE_CMD_FAILED",
    "EXECUTE_CMD_TIMEOUT",
    "NO_GAS_REMAINING_FOUND",
    "NO_ACCEPTED_FOUND",
    "CALL_CONTRACT_FAILED",
    "CREATE_CONTRACT_FAILED",
    "JSON_OUTPUT_CORRUPTED",
    "CONTRACT_NOT_EXIST",
    "STATE_CORRUPTED",
    "LOG_ENTRY_INSTALL_FAILED",
    "MESSAGE_CORRUPTED",
    "RECEIPT_IS_NULL",
    "MAX_EDGES_REACHED",
    "CHAIN_CALL_DIFF_SHARD",
    "PREPARATION_FAILED",
    "NO_OUTPUT",
    "OUTPUT_ILLEGAL",
    "MAP_DEPTH_MISSING",
    "GAS_NOT_SUFFICIENT",
    "INTERNAL_ERROR",
    "LIBRARY_AS_RECIPIENT",
    "VERSION_INCONSISTENT",
    "LIBRARY_EXTRACTION_FAILED",
];

pub fn error_name(code: u32) -> &'static str {
    TRANSACTION_ERRORS
        .get(code as usize)
        .copied()
        .unwrap_or("UNKNOWN")
}

/// `"<code> (<NAME>)"` for every error, grouped by call depth
///
/// Empty for an unconfirmed transaction.
pub fn decode_transaction_errors(tx: &Transaction) -> Vec<Vec<String>> {
    let Some(receipt) = &tx.receipt else {
        return vec![];
    };
    let mut levels: Vec<(&String, &Vec<u32>)> = receipt.errors.iter().collect();
    // depth keys are decimal strings; "10" must sort after "9"
    levels.sort_by_key(|(depth, _)| depth.parse::<u32>().unwrap_or(u32::MAX));
    levels
        .into_iter()
        .map(|(_, codes)| {
            codes
                .iter()
                .map(|code| format!("{} ({})", code, error_name(*code)))
                .collect()
        })
        .collect()
}

/// One `[a,b] ` group per depth
pub fn stringify_transaction_errors(tx: &Transaction) -> String {
    decode_transaction_errors(tx)
        .iter()
        .map(|level| format!("[{}] ", level.join(",")))
        .collect()
}

pub fn event_log(tx: &Transaction) -> &[EventLog] {
    tx.receipt
        .as_ref()
        .map(|r| r.event_logs.as_slice())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Receipt;
    use std::collections::BTreeMap;

    fn failed(errors: &[(&str, Vec<u32>)]) -> Transaction {
        Transaction {
            id: "t".into(),
            receipt: Some(Receipt {
                success: false,
                errors: errors
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect::<BTreeMap<_, _>>(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_decode_levels() {
        let tx = failed(&[("0", vec![7]), ("1", vec![12, 5])]);
        assert_eq!(
            decode_transaction_errors(&tx),
            vec![
                vec!["7 (CALL_CONTRACT_FAILED)".to_string()],
                vec![
                    "12 (LOG_ENTRY_INSTALL_FAILED)".to_string(),
                    "5 (NO_GAS_REMAINING_FOUND)".to_string()
                ],
            ]
        );
    }

    #[test]
    fn test_stringify() {
        let tx = failed(&[("0", vec![0, 1]), ("1", vec![21])]);
        assert_eq!(
            stringify_transaction_errors(&tx),
            "[0 (CHECKER_FAILED),1 (RUNNER_FAILED)] [21 (GAS_NOT_SUFFICIENT)] "
        );
    }

    #[test]
    fn test_depth_order_is_numeric() {
        let mut levels: Vec<(String, Vec<u32>)> = (0..11).map(|d| (d.to_string(), vec![d])).collect();
        levels.reverse();
        let refs: Vec<(&str, Vec<u32>)> = levels.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        let decoded = decode_transaction_errors(&failed(&refs));
        assert_eq!(decoded[10], vec!["10 (CONTRACT_NOT_EXIST)".to_string()]);
        assert_eq!(decoded[9], vec!["9 (JSON_OUTPUT_CORRUPTED)".to_string()]);
    }

    #[test]
    fn test_unconfirmed_and_unknown() {
        let tx = Transaction {
            id: "t".into(),
            receipt: None,
        };
        assert!(decode_transaction_errors(&tx).is_empty());
        assert_eq!(stringify_transaction_errors(&tx), "");
        assert!(event_log(&tx).is_empty());
        assert_eq!(error_name(99), "UNKNOWN");
    }
}
