use serde::{Deserialize, Serialize};
use std::fmt;

use crate::transaction::TransactionKind;

/// The financial service whose message format a segment is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// M-Pesa style mobile money.
    #[serde(alias = "mpesa")]
    MobileMoneyA,
    /// Airtel Money style mobile money.
    #[serde(alias = "airtel")]
    MobileMoneyB,
    Bank,
}

impl Provider {
    /// Order in which provider keywords are checked. Mobile-money brands come
    /// before the bank so that "account number" inside a paybill message does
    /// not route it to the bank patterns.
    pub const DETECTION_ORDER: [Provider; 3] =
        [Provider::MobileMoneyA, Provider::MobileMoneyB, Provider::Bank];

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::MobileMoneyA => "M-Pesa",
            Provider::MobileMoneyB => "Airtel Money",
            Provider::Bank => "Bank",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mobile_money_a" | "mpesa" | "m-pesa" => Ok(Provider::MobileMoneyA),
            "mobile_money_b" | "airtel" | "airtel money" => Ok(Provider::MobileMoneyB),
            "bank" => Ok(Provider::Bank),
            other => Err(format!("Unknown provider: '{other}'")),
        }
    }
}

/// The transaction action a message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Sent,
    Received,
    Withdraw,
    Deposit,
    Paybill,
    #[serde(alias = "buy_goods")]
    Buygoods,
    Debit,
    Credit,
    Transfer,
}

impl Intent {
    pub fn kind(self) -> TransactionKind {
        match self {
            Intent::Received | Intent::Credit | Intent::Deposit => TransactionKind::Income,
            Intent::Sent
            | Intent::Withdraw
            | Intent::Paybill
            | Intent::Buygoods
            | Intent::Debit
            | Intent::Transfer => TransactionKind::Expense,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Sent => "sent",
            Intent::Received => "received",
            Intent::Withdraw => "withdraw",
            Intent::Deposit => "deposit",
            Intent::Paybill => "paybill",
            Intent::Buygoods => "buygoods",
            Intent::Debit => "debit",
            Intent::Credit => "credit",
            Intent::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(Intent::Sent),
            "received" => Ok(Intent::Received),
            "withdraw" => Ok(Intent::Withdraw),
            "deposit" => Ok(Intent::Deposit),
            "paybill" => Ok(Intent::Paybill),
            "buygoods" | "buy_goods" => Ok(Intent::Buygoods),
            "debit" => Ok(Intent::Debit),
            "credit" => Ok(Intent::Credit),
            "transfer" => Ok(Intent::Transfer),
            other => Err(format!("Unknown intent: '{other}'")),
        }
    }
}
