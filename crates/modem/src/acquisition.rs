//! Pilot-correlation acquisition: coarse/fine 2-D (time, frequency)
//! correlation against the pilot template, and the timing-slip edge policy
//! that keeps `tmax` inside a single modem frame.

use crate::ofdm::OfdmParams;
use radae_core::buffer::Complex;
use std::f64::consts::PI;

/// Tunable acquisition search parameters.
#[derive(Debug, Clone)]
pub struct AcqConfig {
    /// Coarse frequency search half-width in Hz.
    pub coarse_freq_range_hz: f64,
    /// Coarse frequency search step in Hz.
    pub coarse_freq_step_hz: f64,
    /// Fine frequency search step in Hz.
    pub fine_freq_step_hz: f64,
    /// Fine time search radius in samples.
    pub fine_time_radius: usize,
    /// Detection threshold as a multiple of the off-peak median.
    pub thresh_factor: f64,
}

impl Default for AcqConfig {
    fn default() -> Self {
        Self {
            coarse_freq_range_hz: 50.0,
            coarse_freq_step_hz: 2.0,
            fine_freq_step_hz: 0.1,
            fine_time_radius: 8,
            thresh_factor: 6.0,
        }
    }
}

/// Result of a coarse pilot search.
#[derive(Debug, Clone, Copy)]
pub struct DetectResult {
    pub candidate: bool,
    pub tmax: usize,
    pub fmax: f64,
    pub dtmax12: f64,
    pub dthresh: f64,
}

/// Result of re-checking pilots at a fixed timing/frequency estimate.
#[derive(Debug, Clone, Copy)]
pub struct CheckResult {
    pub candidate: bool,
    pub endofover: bool,
    pub dtmax12: f64,
}

/// Pilot-correlation acquisition detector.
#[derive(Debug, Clone)]
pub struct Acquisition {
    config: AcqConfig,
}

impl Acquisition {
    pub fn new(config: AcqConfig) -> Self {
        Self { config }
    }

    /// Correlate `rx_buf` starting at sample `t` against `pilot`, after
    /// de-rotating by a constant frequency offset `f_hz`.
    fn correlate(rx_buf: &[Complex], t: usize, f_hz: f64, fs: f64, pilot: &[Complex]) -> Complex {
        let m = pilot.len();
        if t + m > rx_buf.len() {
            return Complex::ZERO;
        }
        let mut acc = Complex::ZERO;
        for n in 0..m {
            let theta = -2.0 * PI * f_hz * (t + n) as f64 / fs;
            let derot = Complex::from_polar(1.0, theta);
            acc += rx_buf[t + n] * derot * pilot[n].conj();
        }
        acc
    }

    fn metric(rx_buf: &[Complex], t: usize, f_hz: f64, fs: f64, pilot: &[Complex]) -> f64 {
        Self::correlate(rx_buf, t, f_hz, fs, pilot).norm_sqr()
    }

    fn freq_grid(lo: f64, hi: f64, step: f64) -> Vec<f64> {
        let mut freqs = Vec::new();
        let mut f = lo;
        while f <= hi + 1e-9 {
            freqs.push(f);
            f += step;
        }
        freqs
    }

    /// Coarse 2-D search over `t in [0, Nmf)` and `f in +-coarse_freq_range_hz`.
    pub fn detect_pilots(&self, rx_buf: &[Complex], params: &OfdmParams) -> DetectResult {
        let nmf = params.nmf();
        let fs = params.fs;
        let freqs = Self::freq_grid(
            -self.config.coarse_freq_range_hz,
            self.config.coarse_freq_range_hz,
            self.config.coarse_freq_step_hz,
        );

        let mut best_t = 0usize;
        let mut best_f = 0.0f64;
        let mut best_d = f64::MIN;
        for &f in &freqs {
            for t in 0..nmf {
                let d = Self::metric(rx_buf, t, f, fs, &params.p);
                if d > best_d {
                    best_d = d;
                    best_t = t;
                    best_f = f;
                }
            }
        }

        self.check_at(rx_buf, params, best_t, best_f, &params.p)
            .to_detect_result(best_t, best_f)
    }

    /// Fine local refinement around a coarse `(tmax, fmax)` estimate.
    pub fn refine(
        &self,
        rx_buf: &[Complex],
        params: &OfdmParams,
        tmax: usize,
        fmax: f64,
        tfine_radius: usize,
        ffine_range_hz: f64,
    ) -> (usize, f64) {
        let fs = params.fs;
        let freqs = Self::freq_grid(
            fmax - ffine_range_hz,
            fmax + ffine_range_hz,
            self.config.fine_freq_step_hz,
        );
        let t_lo = tmax.saturating_sub(tfine_radius);
        let t_hi = tmax + tfine_radius;

        let mut best_t = tmax;
        let mut best_f = fmax;
        let mut best_d = f64::MIN;
        for &f in &freqs {
            for t in t_lo..=t_hi {
                let d = Self::metric(rx_buf, t, f, fs, &params.p);
                if d > best_d {
                    best_d = d;
                    best_t = t;
                    best_f = f;
                }
            }
        }
        (best_t, best_f)
    }

    /// Recompute `Dtmax12` (and the end-of-over variant using `pend`) at a
    /// fixed timing/frequency estimate, without searching.
    pub fn check_pilots(
        &self,
        rx_buf: &[Complex],
        params: &OfdmParams,
        tmax: usize,
        fmax: f64,
    ) -> CheckResult {
        let inner = self.check_at(rx_buf, params, tmax, fmax, &params.p);
        let eoo = self.check_at(rx_buf, params, tmax, fmax, &params.pend);
        CheckResult {
            candidate: inner.candidate,
            endofover: eoo.dtmax12 > eoo.dthresh && eoo.dtmax12 > inner.dtmax12,
            dtmax12: inner.dtmax12,
        }
    }

    /// Shared helper computing `Dtmax12` and the off-peak threshold for a
    /// given pilot template at a fixed `(t, f)`.
    fn check_at(
        &self,
        rx_buf: &[Complex],
        params: &OfdmParams,
        t: usize,
        f: f64,
        pilot: &[Complex],
    ) -> Inner {
        let nmf = params.nmf();
        let fs = params.fs;

        let d1 = Self::metric(rx_buf, t, f, fs, pilot);
        let d2 = Self::metric(rx_buf, t + nmf, f, fs, pilot);
        let dtmax12 = d1 + d2;

        let mut ds: Vec<f64> = (0..nmf)
            .map(|tt| Self::metric(rx_buf, tt, f, fs, pilot))
            .collect();
        ds.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = ds[ds.len() / 2];
        let dthresh = median * self.config.thresh_factor;

        Inner {
            dtmax12,
            dthresh,
            candidate: dtmax12 > dthresh,
        }
    }

    /// The timing-slip edge policy (§4.3): keeps `tmax` within one modem
    /// frame by shifting the next read size `nin` and adjusting `tmax`
    /// accordingly.
    pub fn timing_slip(tmax: usize, nmf: usize, m: usize) -> (usize, usize) {
        if tmax >= nmf.saturating_sub(m) {
            (nmf + m, tmax - m)
        } else if tmax < m {
            (nmf - m, tmax + m)
        } else {
            (nmf, tmax)
        }
    }
}

struct Inner {
    dtmax12: f64,
    dthresh: f64,
    candidate: bool,
}

impl Inner {
    fn to_detect_result(self, tmax: usize, fmax: f64) -> DetectResult {
        DetectResult {
            candidate: self.candidate,
            tmax,
            fmax,
            dtmax12: self.dtmax12,
            dthresh: self.dthresh,
        }
    }
}
