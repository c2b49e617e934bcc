//! Statutory contribution tables for the 2024 Malaysian schedule.
//!
//! SOCSO and EIS are banded: a wage resolves to the first band whose
//! ceiling covers it, and the band's fixed contribution amounts apply.
//! Wages past the last ceiling use the capped maximum row. EPF is a rate
//! rule rather than a table and lives here alongside them.

use std::str::FromStr;
use std::sync::OnceLock;

use bigdecimal::BigDecimal;

use crate::money;

/// One contribution band: fixed employee/employer amounts for any wage up
/// to (and including) the ceiling.
#[derive(Debug, Clone)]
pub struct WageBand {
    pub wage_ceiling: BigDecimal,
    pub employee: BigDecimal,
    pub employer: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct ContributionTable {
    bands: Vec<WageBand>,
    max: WageBand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub employee: BigDecimal,
    pub employer: BigDecimal,
}

impl ContributionTable {
    /// First band whose ceiling covers the wage; the capped maximum row
    /// for anything past the table.
    pub fn lookup(&self, wage: &BigDecimal) -> Contribution {
        let band = self
            .bands
            .iter()
            .find(|band| &band.wage_ceiling >= wage)
            .unwrap_or(&self.max);

        Contribution {
            employee: band.employee.clone(),
            employer: band.employer.clone(),
        }
    }

    pub fn bands(&self) -> &[WageBand] {
        &self.bands
    }

    pub fn max_row(&self) -> &WageBand {
        &self.max
    }
}

/// SOCSO: bands at RM30 then every RM100 up to RM6,000; capped at
/// 29.75 / 104.15 beyond.
pub fn socso_table() -> &'static ContributionTable {
    static TABLE: OnceLock<ContributionTable> = OnceLock::new();
    TABLE.get_or_init(build_socso_table)
}

/// EIS: bands at RM30 then every RM100 up to RM5,000; capped at
/// 11.90 / 11.90 beyond.
pub fn eis_table() -> &'static ContributionTable {
    static TABLE: OnceLock<ContributionTable> = OnceLock::new();
    TABLE.get_or_init(build_eis_table)
}

fn build_socso_table() -> ContributionTable {
    let mut bands = Vec::with_capacity(61);
    bands.push(WageBand {
        wage_ceiling: BigDecimal::from(30),
        employee: money::from_sen(10),
        employer: money::from_sen(40),
    });

    for index in 1..=60i64 {
        let ceiling = index * 100;
        // Employee side: 0.5% of the band's assumed wage.
        let employee_sen = (ceiling - 50) / 2;
        // Employer side: the published schedule amounts, anchored at
        // 0.40 (RM30), 44.35 (RM3,000) and 104.15 (RM6,000) with even
        // steps between anchors, half-sen rounded up.
        let employer_sen = if index <= 30 {
            (80 + 293 * index + 1) / 2
        } else {
            4435 + (2 * 598 * (index - 30) + 3) / 6
        };
        bands.push(WageBand {
            wage_ceiling: BigDecimal::from(ceiling),
            employee: money::from_sen(employee_sen),
            employer: money::from_sen(employer_sen),
        });
    }

    let max = bands
        .last()
        .cloned()
        .expect("socso table has at least one band");

    ContributionTable { bands, max }
}

fn build_eis_table() -> ContributionTable {
    let mut bands = Vec::with_capacity(51);
    bands.push(WageBand {
        wage_ceiling: BigDecimal::from(30),
        employee: money::from_sen(5),
        employer: money::from_sen(5),
    });

    for index in 1..=50i64 {
        let ceiling = index * 100;
        // Both sides contribute 0.2% of the band's assumed wage.
        let sen = (ceiling - 50) / 5;
        bands.push(WageBand {
            wage_ceiling: BigDecimal::from(ceiling),
            employee: money::from_sen(sen),
            employer: money::from_sen(sen),
        });
    }

    let max = WageBand {
        wage_ceiling: BigDecimal::from(5000),
        employee: money::from_sen(1190),
        employer: money::from_sen(1190),
    };

    ContributionTable { bands, max }
}

/// Default employee EPF rate (11%), decimal(5,4).
pub fn default_employee_epf_rate() -> BigDecimal {
    BigDecimal::from_str("0.1100").expect("static rate literal")
}

/// Employer EPF rate tier: 13% up to a rounded base of RM5,000, 12% above.
pub fn employer_epf_rate(rounded_base: &BigDecimal) -> BigDecimal {
    if rounded_base <= &BigDecimal::from(5000) {
        BigDecimal::from_str("0.1300").expect("static rate literal")
    } else {
        BigDecimal::from_str("0.1200").expect("static rate literal")
    }
}
