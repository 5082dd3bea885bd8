//! A holding of one security in one account.

use crate::domain::{
    AccountId, BasisMode, Decimal, LotOverflow, PositionId, RightsLedger, SecurityClass, Symbol,
    TimeMs,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: PositionId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    #[serde(default)]
    pub name: String,
    /// Current share count, after rights events.
    pub shares: i64,
    /// Original per-share purchase cost.
    pub cost_price: Decimal,
    /// Per-share cost after replaying rights events.
    pub adjusted_cost_price: Decimal,
    #[serde(default)]
    pub current_price: Decimal,
    pub purchase_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_dividend_update: Option<TimeMs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_updated_at: Option<TimeMs>,
    /// Per-security sell tax override, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_tax_rate: Option<Decimal>,
    pub rights: RightsLedger,
}

/// Problem found while validating a position or an untyped stock record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionIssue {
    pub field: String,
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    Invalid,
    Negative,
    Inconsistent,
}

impl PositionIssue {
    fn new(field: &str, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            message: message.into(),
        }
    }
}

const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "accountId",
    "symbol",
    "shares",
    "costPrice",
    "purchaseDate",
];

impl Position {
    pub fn new(
        account_id: AccountId,
        symbol: Symbol,
        name: String,
        shares: i64,
        cost_price: Decimal,
        purchase_date: NaiveDate,
        basis_mode: BasisMode,
    ) -> Result<Self, LotOverflow> {
        let rights = RightsLedger::new(shares, cost_price, basis_mode)?;
        Ok(Self {
            id: PositionId::generate(),
            account_id,
            symbol,
            name,
            shares,
            cost_price,
            adjusted_cost_price: cost_price,
            current_price: cost_price,
            purchase_date,
            last_dividend_update: None,
            price_updated_at: None,
            transaction_tax_rate: None,
            rights,
        })
    }

    pub fn with_id(mut self, id: PositionId) -> Self {
        self.id = id;
        self
    }

    pub fn security_class(&self) -> SecurityClass {
        SecurityClass::classify(&self.symbol, Some(&self.name))
    }

    /// None when the value does not fit in a `Decimal`.
    pub fn market_value(&self) -> Option<Decimal> {
        Decimal::lot_value(self.shares, self.current_price)
    }

    /// Replace the lot after a user edit; all rights adjustments are discarded.
    pub fn reset_lot(&mut self, lot: RightsLedger) {
        self.shares = lot.original_shares;
        self.cost_price = lot.original_cost_price;
        self.adjusted_cost_price = lot.original_cost_price;
        self.rights = lot;
        self.last_dividend_update = None;
    }

    /// Copy only the rights-adjustment fields of `adjusted` onto this record.
    ///
    /// Identity and user-maintained fields (id, account, symbol, name, price,
    /// tax override) always come from `self`.
    pub fn merge_adjustment(&self, adjusted: &Position) -> Position {
        Position {
            shares: adjusted.shares,
            adjusted_cost_price: adjusted.adjusted_cost_price,
            rights: adjusted.rights.clone(),
            last_dividend_update: adjusted.last_dividend_update,
            ..self.clone()
        }
    }

    /// Structural checks; returns every problem instead of failing on the first.
    pub fn validate(&self) -> Vec<PositionIssue> {
        let mut issues = Vec::new();

        if self.symbol.as_str().is_empty() {
            issues.push(PositionIssue::new("symbol", IssueKind::Missing, "symbol is empty"));
        }
        if self.account_id.as_str().is_empty() {
            issues.push(PositionIssue::new(
                "accountId",
                IssueKind::Missing,
                "account id is empty",
            ));
        }
        if self.shares < 0 {
            issues.push(PositionIssue::new("shares", IssueKind::Negative, "shares must be >= 0"));
        }
        if self.cost_price.is_negative() {
            issues.push(PositionIssue::new(
                "costPrice",
                IssueKind::Negative,
                "cost price must be >= 0",
            ));
        }
        if self.adjusted_cost_price.is_negative() {
            issues.push(PositionIssue::new(
                "adjustedCostPrice",
                IssueKind::Negative,
                "adjusted cost price must be >= 0",
            ));
        }
        if self.current_price.is_negative() {
            issues.push(PositionIssue::new(
                "currentPrice",
                IssueKind::Negative,
                "current price must be >= 0",
            ));
        }
        if let Some(rate) = self.transaction_tax_rate {
            if rate.is_negative() {
                issues.push(PositionIssue::new(
                    "transactionTaxRate",
                    IssueKind::Negative,
                    "tax rate must be >= 0",
                ));
            }
        }
        if self.rights.current_shares != self.shares {
            issues.push(PositionIssue::new(
                "rights",
                IssueKind::Inconsistent,
                format!(
                    "ledger holds {} shares but record holds {}",
                    self.rights.current_shares, self.shares
                ),
            ));
        }
        if self.rights.adjusted_cost_price() != self.adjusted_cost_price {
            issues.push(PositionIssue::new(
                "adjustedCostPrice",
                IssueKind::Inconsistent,
                "adjusted cost price does not match the rights ledger",
            ));
        }

        issues
    }

    /// Validate and convert an untyped stock record (e.g. from an import file).
    ///
    /// Records without a rights ledger get a fresh one built from
    /// `shares`/`costPrice`.
    pub fn from_record(
        record: &serde_json::Value,
        basis_mode: BasisMode,
    ) -> Result<Position, Vec<PositionIssue>> {
        let Some(obj) = record.as_object() else {
            return Err(vec![PositionIssue::new(
                "$",
                IssueKind::Invalid,
                "record is not an object",
            )]);
        };

        let missing: Vec<PositionIssue> = REQUIRED_FIELDS
            .iter()
            .filter(|f| obj.get(**f).map_or(true, |v| v.is_null()))
            .map(|f| PositionIssue::new(f, IssueKind::Missing, format!("{} is required", f)))
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let mut normalized = obj.clone();
        if !normalized.contains_key("adjustedCostPrice") {
            normalized.insert("adjustedCostPrice".to_string(), obj["costPrice"].clone());
        }
        if !normalized.contains_key("rights") {
            let shares = obj["shares"].as_i64().unwrap_or_default();
            let cost = decimal_field(&obj["costPrice"]).unwrap_or_default();
            let ledger = RightsLedger::new(shares, cost, basis_mode).map_err(|e| {
                vec![PositionIssue::new("costPrice", IssueKind::Invalid, e.to_string())]
            })?;
            let ledger_json = serde_json::to_value(ledger).map_err(|e| {
                vec![PositionIssue::new("rights", IssueKind::Invalid, e.to_string())]
            })?;
            normalized.insert("rights".to_string(), ledger_json);
        }

        let position: Position = serde_json::from_value(serde_json::Value::Object(normalized))
            .map_err(|e| vec![PositionIssue::new("$", IssueKind::Invalid, e.to_string())])?;

        let issues = position.validate();
        if issues.is_empty() {
            Ok(position)
        } else {
            Err(issues)
        }
    }
}

fn decimal_field(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => Decimal::from_str_canonical(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str_canonical(&n.to_string()).ok(),
        _ => None,
    }
}
