//! Billing figures over completed appointments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Revenue statistics for a set of completed appointments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStats {
    pub count: usize,
    pub total_revenue: Decimal,
    /// Zero when `count` is zero.
    pub average_per_appointment: Decimal,
}

impl BillingStats {
    /// Aggregates appointment totals. The average is exact; rounding is
    /// left to whoever displays it.
    pub fn from_totals<I>(totals: I) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        let (count, total) = totals
            .into_iter()
            .fold((0usize, Decimal::ZERO), |(n, sum), t| (n + 1, sum + t));

        let average = if count == 0 {
            Decimal::ZERO
        } else {
            total / Decimal::from(count)
        };

        Self {
            count,
            total_revenue: total,
            average_per_appointment: average,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn empty_has_zero_average() {
        let stats = BillingStats::from_totals(std::iter::empty());
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total_revenue, Decimal::ZERO);
        assert_eq!(stats.average_per_appointment, Decimal::ZERO);
    }

    #[test]
    fn sums_and_averages() {
        let stats = BillingStats::from_totals([dec("40"), dec("25.50"), dec("15")]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_revenue, dec("80.50"));
        assert_eq!(
            stats.average_per_appointment,
            stats.total_revenue / Decimal::from(stats.count)
        );
    }

    #[test]
    fn average_is_not_rounded() {
        let stats = BillingStats::from_totals([dec("10"), dec("10"), dec("10.01")]);
        assert_eq!(stats.total_revenue, dec("30.01"));
        assert_eq!(stats.average_per_appointment, dec("30.01") / Decimal::from(3));
        assert_ne!(stats.average_per_appointment, dec("10.00"));
    }

    #[test]
    fn serializes_as_numbers() {
        let stats = BillingStats::from_totals([dec("40")]);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["totalRevenue"].as_f64(), Some(40.0));
        assert_eq!(json["averagePerAppointment"].as_f64(), Some(40.0));
    }
}
