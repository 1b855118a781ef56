/// Radial falloff for soft dabs.
///
/// Inside `hardness` of the radius the dab is fully opaque; beyond it alpha
/// decays as `(1 - v)^1.5` towards the rim.
pub fn falloff(t: f32, hardness: f32) -> f32 {
    let hardness = hardness.clamp(0.0, 0.999);
    if t < hardness {
        return 1.0;
    }
    let v = ((t - hardness) / (1.0 - hardness)).clamp(0.0, 1.0);
    (1.0 - v).powf(1.5)
}

const TABLE_LEN: usize = 256;

/// Precomputed falloff curve for one hardness value, indexed by normalized
/// distance from the dab center.
#[derive(Clone, Debug)]
pub struct FalloffTable {
    hardness: f32,
    table: Vec<f32>,
}

impl FalloffTable {
    /// `hardness` in percent, 0..=100. 100 disables the falloff entirely.
    pub fn new(hardness: f32) -> Self {
        let h = (hardness / 100.0).clamp(0.0, 1.0);
        let table = (0..TABLE_LEN)
            .map(|i| {
                if h >= 1.0 {
                    1.0
                } else {
                    falloff(i as f32 / (TABLE_LEN - 1) as f32, h)
                }
            })
            .collect();
        Self {
            hardness,
            table,
        }
    }

    pub fn hardness(&self) -> f32 {
        self.hardness
    }

    /// Falloff at normalized distance `t`; zero outside the unit radius.
    #[inline]
    pub fn sample(&self, t: f32) -> f32 {
        if t > 1.0 {
            return 0.0;
        }
        let idx = (t.max(0.0) * (TABLE_LEN - 1) as f32).round() as usize;
        self.table[idx.min(TABLE_LEN - 1)]
    }
}
