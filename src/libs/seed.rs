use std::collections::HashSet;

use serde::Serialize;

use crate::libs::error::{Error, Result};

/// A currency always present in a fresh database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencySeed {
    pub name: String,
    pub alpha_code: String,
}

impl CurrencySeed {
    pub fn new(name: &str, alpha_code: &str) -> Self {
        Self {
            name: name.to_string(),
            alpha_code: alpha_code.to_string(),
        }
    }
}

/// A sample account. `currency` names a [`CurrencySeed`] and is swapped for
/// that currency's generated id at insert time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSeed {
    pub name: String,
    pub balance: i64,
    pub currency: String,
}

impl AccountSeed {
    pub fn new(name: &str, balance: i64, currency: &str) -> Self {
        Self {
            name: name.to_string(),
            balance,
            currency: currency.to_string(),
        }
    }
}

/// Row shape written to `accounts` once the currency reference is resolved.
#[derive(Debug, Serialize)]
pub struct AccountRow<'a> {
    pub name: &'a str,
    pub balance: i64,
    pub currency_id: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub currencies: Vec<CurrencySeed>,
    pub accounts: Vec<AccountSeed>,
}

impl Catalog {
    pub fn base() -> Self {
        Self {
            currencies: vec![
                CurrencySeed::new("Ruble", "RUB"),
                CurrencySeed::new("Dollar", "USD"),
                CurrencySeed::new("Euro", "EUR"),
            ],
            accounts: Vec::new(),
        }
    }

    /// Base currencies plus Zloty and two sample accounts.
    pub fn extended() -> Self {
        let mut catalog = Self::base();
        catalog.currencies.push(CurrencySeed::new("Zloty", "PLN"));
        catalog.accounts = vec![
            AccountSeed::new("Wallet", 25_000, "Zloty"),
            AccountSeed::new("Savings", 1_200_000, "Ruble"),
        ];
        catalog
    }

    pub fn for_fixtures(extended: bool) -> Self {
        if extended { Self::extended() } else { Self::base() }
    }

    /// Accounts reference currencies by name, so names must be unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for currency in &self.currencies {
            if !seen.insert(currency.name.as_str()) {
                return Err(Error::schema(
                    "currencies",
                    format!("currency `{}` listed twice", currency.name),
                ));
            }
        }
        Ok(())
    }
}
