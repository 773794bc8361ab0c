use crate::duration::DurationSpec;
use crate::seat::{CustomPricing, SeatTier};

/// Library-wide default rate per hour, by tier.
pub fn hourly_rate(tier: SeatTier) -> i64 {
    match tier {
        SeatTier::Basic => 25,
        SeatTier::Standard => 40,
        SeatTier::Premium => 60,
    }
}

/// Library-wide flat rate for a full-day booking, by tier.
pub fn daily_rate(tier: SeatTier) -> i64 {
    match tier {
        SeatTier::Basic => 250,
        SeatTier::Standard => 400,
        SeatTier::Premium => 600,
    }
}

/// Library-wide default rate per month, by tier.
pub fn monthly_rate(tier: SeatTier) -> i64 {
    match tier {
        SeatTier::Basic => 4500,
        SeatTier::Standard => 6000,
        SeatTier::Premium => 8500,
    }
}

/// Loyalty discount applied to yearly plans, in percent.
pub const YEARLY_DISCOUNT_PERCENT: i64 = 15;

/// Resolve the price of a booking. Seat overrides win over tier defaults
/// for their duration class; yearly plans are always priced off the tier
/// default monthly rate, never off overrides.
///
/// All rates in the default table are whole currency units, so the yearly
/// discount math stays exact in integer arithmetic.
pub fn quote(duration: &DurationSpec, tier: SeatTier, overrides: Option<&CustomPricing>) -> i64 {
    match duration {
        DurationSpec::Hourly { hours } => {
            let rate = overrides
                .and_then(|o| o.hourly)
                .unwrap_or_else(|| hourly_rate(tier));
            rate * i64::from(*hours)
        }
        DurationSpec::Daily => overrides
            .and_then(|o| o.daily)
            .unwrap_or_else(|| daily_rate(tier)),
        DurationSpec::Monthly { months } => {
            let rate = overrides
                .and_then(|o| o.monthly)
                .unwrap_or_else(|| monthly_rate(tier));
            rate * i64::from(*months)
        }
        DurationSpec::Yearly => {
            12 * monthly_rate(tier) * (100 - YEARLY_DISCOUNT_PERCENT) / 100
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_defaults_are_deterministic() {
        assert_eq!(
            quote(&DurationSpec::Hourly { hours: 4 }, SeatTier::Standard, None),
            160
        );
        assert_eq!(quote(&DurationSpec::Daily, SeatTier::Premium, None), 600);
        assert_eq!(
            quote(&DurationSpec::Monthly { months: 3 }, SeatTier::Basic, None),
            13500
        );
        assert_eq!(quote(&DurationSpec::Yearly, SeatTier::Standard, None), 61200);
    }

    #[test]
    fn overrides_win_over_tier_defaults() {
        let overrides = CustomPricing {
            hourly: Some(100),
            ..Default::default()
        };
        assert_eq!(
            quote(
                &DurationSpec::Hourly { hours: 4 },
                SeatTier::Basic,
                Some(&overrides)
            ),
            400
        );
    }

    #[test]
    fn partial_overrides_fall_through_per_class() {
        let overrides = CustomPricing {
            hourly: Some(100),
            daily: None,
            monthly: Some(5000),
        };
        assert_eq!(
            quote(&DurationSpec::Daily, SeatTier::Standard, Some(&overrides)),
            400
        );
        assert_eq!(
            quote(
                &DurationSpec::Monthly { months: 2 },
                SeatTier::Standard,
                Some(&overrides)
            ),
            10000
        );
    }

    #[test]
    fn yearly_never_reads_overrides() {
        let overrides = CustomPricing {
            monthly: Some(1),
            ..Default::default()
        };
        assert_eq!(
            quote(&DurationSpec::Yearly, SeatTier::Basic, Some(&overrides)),
            12 * 4500 * 85 / 100
        );
    }

    #[test]
    fn yearly_discount_is_exact_for_every_tier() {
        for tier in [SeatTier::Basic, SeatTier::Standard, SeatTier::Premium] {
            let undiscounted = 12 * monthly_rate(tier);
            assert_eq!(undiscounted * 85 % 100, 0);
            assert_eq!(quote(&DurationSpec::Yearly, tier, None), undiscounted * 85 / 100);
        }
    }
}
