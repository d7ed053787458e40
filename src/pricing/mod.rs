// src/pricing/mod.rs
//
// Tariff engine behind the public calculator. Pure arithmetic over a
// resolved tariff row; the tariff lookup itself stays in the route layer.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

pub const CURRENCY: &str = "KZT";

/// Premium rate applied to the declared insurance value.
const INSURANCE_RATE: Decimal = dec!(0.02);

#[derive(Debug, Clone)]
pub struct Tariff {
    pub base_price: Decimal,
    pub price_per_kg: Decimal,
    pub price_per_km: Decimal,
}

impl Tariff {
    /// Fallback when no tariff row matches (cargo_type, zone).
    pub fn default_for_zone(zone: &str) -> Self {
        if zone == "astana" {
            Self {
                base_price: dec!(2000),
                price_per_kg: dec!(100),
                price_per_km: dec!(80),
            }
        } else {
            Self {
                base_price: dec!(4000),
                price_per_kg: dec!(200),
                price_per_km: dec!(150),
            }
        }
    }
}

pub fn priority_multiplier(priority: &str) -> Decimal {
    match priority {
        "urgent" => dec!(1.5),
        "express" => dec!(2.0),
        _ => dec!(1.0),
    }
}

#[derive(Debug, Serialize)]
pub struct Quote {
    pub base_cost: Decimal,
    pub weight_cost: Decimal,
    pub distance_cost: Decimal,
    pub insurance_cost: Decimal,
    pub priority_multiplier: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub currency: &'static str,
}

pub fn quote(
    tariff: &Tariff,
    weight: Decimal,
    distance: Option<Decimal>,
    priority: &str,
    insurance_value: Option<Decimal>,
) -> Quote {
    let weight_cost = weight * tariff.price_per_kg;
    let distance_cost = match distance {
        Some(km) if km > Decimal::ZERO => km * tariff.price_per_km,
        _ => Decimal::ZERO,
    };
    let multiplier = priority_multiplier(priority);
    let subtotal = (tariff.base_price + weight_cost + distance_cost) * multiplier;
    let insurance_cost = match insurance_value {
        Some(v) if v > Decimal::ZERO => v * INSURANCE_RATE,
        _ => Decimal::ZERO,
    };
    let total = (subtotal + insurance_cost)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Quote {
        base_cost: tariff.base_price,
        weight_cost,
        distance_cost,
        insurance_cost,
        priority_multiplier: multiplier,
        subtotal,
        total,
        currency: CURRENCY,
    }
}

impl Quote {
    /// Display lines for the calculator widget.
    pub fn breakdown(&self) -> serde_json::Value {
        serde_json::json!({
            "base": format!("Базовый тариф: {:.2} ₸", self.base_cost),
            "weight": format!("За вес: {:.2} ₸", self.weight_cost),
            "distance": format!("За расстояние: {:.2} ₸", self.distance_cost),
            "insurance": format!("Страховка: {:.2} ₸", self.insurance_cost),
            "priority": format!("Коэффициент срочности: x{}", self.priority_multiplier),
            "total": format!("Итого: {:.2} ₸", self.total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tariff_by_zone() {
        let t = Tariff::default_for_zone("astana");
        assert_eq!(t.base_price, dec!(2000));
        assert_eq!(t.price_per_kg, dec!(100));
        assert_eq!(t.price_per_km, dec!(80));

        let t = Tariff::default_for_zone("karaganda");
        assert_eq!(t.base_price, dec!(4000));
        assert_eq!(t.price_per_kg, dec!(200));
        assert_eq!(t.price_per_km, dec!(150));
    }

    #[test]
    fn multiplier_table() {
        assert_eq!(priority_multiplier("urgent"), dec!(1.5));
        assert_eq!(priority_multiplier("express"), dec!(2.0));
        assert_eq!(priority_multiplier("normal"), dec!(1.0));
        assert_eq!(priority_multiplier(""), dec!(1.0));
    }

    #[test]
    fn astana_parcel_without_extras() {
        // 2000 + 10kg * 100 = 3000.00 KZT
        let q = quote(&Tariff::default_for_zone("astana"), dec!(10), None, "normal", None);
        assert_eq!(q.base_cost, dec!(2000));
        assert_eq!(q.weight_cost, dec!(1000));
        assert_eq!(q.total, dec!(3000.00));
        assert_eq!(q.currency, "KZT");
    }

    #[test]
    fn full_formula_with_distance_priority_insurance() {
        // (4000 + 5*200 + 120*150) * 1.5 + 50000*0.02
        let t = Tariff::default_for_zone("karaganda");
        let q = quote(&t, dec!(5), Some(dec!(120)), "urgent", Some(dec!(50000)));
        assert_eq!(q.weight_cost, dec!(1000));
        assert_eq!(q.distance_cost, dec!(18000));
        assert_eq!(q.subtotal, dec!(34500));
        assert_eq!(q.insurance_cost, dec!(1000));
        assert_eq!(q.total, dec!(35500.00));
    }

    #[test]
    fn zero_distance_and_insurance_are_skipped() {
        let t = Tariff::default_for_zone("astana");
        let q = quote(&t, dec!(1), Some(dec!(0)), "normal", Some(dec!(0)));
        assert_eq!(q.distance_cost, Decimal::ZERO);
        assert_eq!(q.insurance_cost, Decimal::ZERO);
        assert_eq!(q.total, dec!(2100));
    }

    #[test]
    fn total_rounds_half_away_from_zero() {
        // 2100 + 1.25*0.02 = 2100.025 → 2100.03
        let t = Tariff::default_for_zone("astana");
        let q = quote(&t, dec!(1), None, "normal", Some(dec!(1.25)));
        assert_eq!(q.total, dec!(2100.03));
    }
}
