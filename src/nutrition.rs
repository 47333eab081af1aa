use serde::{Deserialize, Serialize};

/// Calories/carbs/protein/fats aggregate. Never persisted: recomputed on
/// every read by folding over a parent's composition links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ccpf {
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

fn step(acc: i32, per_100g: i32, grams: i32) -> i32 {
    (acc as f64 + per_100g as f64 / 100.0 * grams as f64) as i32
}

impl Ccpf {
    /// Fold in one quantity-bearing child: each field contributes
    /// `per-100g value / 100 * grams`, and the running total is truncated
    /// back to an integer after every step rather than once at the end.
    /// That makes the result depend on fold order and lose fractions
    /// per step; kept as the reference behaviour (see DESIGN.md).
    pub fn add_weighted(self, per_100g: Ccpf, grams: i32) -> Ccpf {
        Ccpf {
            calories: step(self.calories, per_100g.calories, grams),
            carbs: step(self.carbs, per_100g.carbs, grams),
            protein: step(self.protein, per_100g.protein, grams),
            fats: step(self.fats, per_100g.fats, grams),
        }
    }

    /// Fold in one pure-membership child whose own aggregate is already
    /// computed: plain integer addition, no scaling.
    pub fn add(self, other: Ccpf) -> Ccpf {
        Ccpf {
            calories: self.calories + other.calories,
            carbs: self.carbs + other.carbs,
            protein: self.protein + other.protein,
            fats: self.fats + other.fats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal(calories: i32) -> Ccpf {
        Ccpf {
            calories,
            ..Ccpf::default()
        }
    }

    #[test]
    fn weighted_fold_scales_by_grams() {
        // 100 kcal/100g at 50g plus 200 kcal/100g at 100g = 50 + 200
        let total = Ccpf::default().add_weighted(cal(100), 50).add_weighted(cal(200), 100);
        assert_eq!(total.calories, 250);
    }

    #[test]
    fn truncation_happens_at_every_step() {
        // Two 1 kcal/100g items at 50g each contribute 0.5 kcal per step.
        // Per-step truncation drops both halves; a sum-then-truncate fold
        // would have produced 1.
        let total = Ccpf::default().add_weighted(cal(1), 50).add_weighted(cal(1), 50);
        assert_eq!(total.calories, 0);
    }

    #[test]
    fn membership_fold_adds_without_scaling() {
        let a = Ccpf {
            calories: 300,
            carbs: 20,
            protein: 15,
            fats: 10,
        };
        let b = Ccpf {
            calories: 150,
            carbs: 5,
            protein: 30,
            fats: 2,
        };
        let total = Ccpf::default().add(a).add(b);
        assert_eq!(total.calories, 450);
        assert_eq!(total.carbs, 25);
        assert_eq!(total.protein, 45);
        assert_eq!(total.fats, 12);
    }

    #[test]
    fn all_fields_are_weighted() {
        let item = Ccpf {
            calories: 60,
            carbs: 5,
            protein: 3,
            fats: 3,
        };
        let total = Ccpf::default().add_weighted(item, 200);
        assert_eq!(
            total,
            Ccpf {
                calories: 120,
                carbs: 10,
                protein: 6,
                fats: 6,
            }
        );
    }
}
