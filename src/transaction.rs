//! Transfer records buffered in the pending pool and sealed into blocks

use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};

/// Sender used for mining-reward transactions.
pub const COINBASE_SENDER: &str = "0";

/// A value transfer between two parties.
///
/// Nothing about a transaction is validated: identities are free-form and
/// `amount` may be any JSON number, negative or fractional. The amount is
/// kept as a [`Number`] holding its literal text, so integers of any size
/// and floats serialize (and hash) exactly as they were supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: Number,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Number>,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }

    /// Reward paid to `recipient` for sealing a block.
    pub fn coinbase(recipient: impl Into<String>, amount: impl Into<Number>) -> Self {
        Self::new(COINBASE_SENDER, recipient, amount)
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    pub fn to_value(&self) -> Value {
        json!({
            "sender": self.sender,
            "recipient": self.recipient,
            "amount": self.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_keeps_number_kind() {
        let int_tx = Transaction::new("A", "B", 10);
        assert!(int_tx.amount.is_i64());
        assert_eq!(serde_json::to_string(&int_tx).unwrap(), r#"{"sender":"A","recipient":"B","amount":10}"#);

        let float_tx = Transaction::new("A", "B", Number::from_f64(2.5).unwrap());
        assert_eq!(float_tx.to_value()["amount"], serde_json::json!(2.5));
    }

    #[test]
    fn test_negative_amounts_accepted() {
        let tx = Transaction::new("A", "B", -5);
        assert_eq!(tx.amount.as_i64(), Some(-5));
    }

    #[test]
    fn test_coinbase() {
        let reward = Transaction::coinbase("node-1", 1u64);
        assert!(reward.is_coinbase());
        assert_eq!(reward.sender, "0");
        assert_eq!(reward.recipient, "node-1");
        assert!(!Transaction::new("A", "B", 1).is_coinbase());
    }
}
