/// Seedable xorshift64* generator. All jitter in the engine is drawn from one instance created
/// per layout call from `LayoutOptions::random_seed`, so layouts are reproducible.
#[derive(Debug, Clone)]
pub(crate) struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// `[0, 1)` with 53 bits of precision.
    pub(crate) fn next_f64_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    pub(crate) fn next_angle(&mut self) -> f64 {
        self.next_f64_unit() * std::f64::consts::TAU
    }

    pub(crate) fn unit_vector(&mut self) -> (f64, f64) {
        let a = self.next_angle();
        (a.cos(), a.sin())
    }

    /// Uniformly distributed offset inside a disk of `radius`.
    pub(crate) fn in_disk(&mut self, radius: f64) -> (f64, f64) {
        let a = self.next_angle();
        let r = radius * self.next_f64_unit().sqrt();
        (r * a.cos(), r * a.sin())
    }
}
