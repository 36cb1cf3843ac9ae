//! The value computation engine: raw measurements to currency, with
//! per-subject diminishing returns.
//!
//! Every function here except [`ValueEngine::commit`] is pure. `commit`
//! takes the subject by `&mut`, so the read of `collected` and the write
//! back happen in one step with nothing able to observe or interleave
//! between them.

use crate::subject::ScienceSubject;

/// Converts measurements into currency for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueEngine {
    /// Game difficulty scalar applied to every award.
    pub gain_multiplier: f64,
}

impl Default for ValueEngine {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ValueEngine {
    pub fn new(gain_multiplier: f64) -> Self {
        let gain_multiplier = if gain_multiplier.is_finite() && gain_multiplier >= 0.0 {
            gain_multiplier
        } else {
            tracing::warn!(target: "rnd", gain_multiplier, "invalid gain multiplier, using 1.0");
            1.0
        };
        Self { gain_multiplier }
    }

    /// Reference units in `amount` data units for this subject.
    pub fn reference_multiplier(&self, amount: f64, subject: &ScienceSubject) -> f64 {
        if !(subject.data_scale > 0.0) {
            return finite_or_zero(amount);
        }
        finite_or_zero(amount / subject.data_scale)
    }

    /// Apply diminishing returns to `raw` given what the subject has
    /// already yielded: linear decay to zero at the cap.
    pub fn subject_value(&self, raw: f64, subject: &ScienceSubject) -> f64 {
        finite_or_zero(raw * remaining_fraction(subject.collected, subject.science_cap))
    }

    /// Currency the measurement would credit now. Never pushes the
    /// subject's collected total past its cap.
    pub fn currency_value(&self, amount: f64, subject: &ScienceSubject, transmission: f64) -> f64 {
        self.value_at(amount, subject, transmission, subject.collected)
    }

    /// Currency the same measurement would credit if repeated right after
    /// committing this one.
    pub fn next_currency_value(
        &self,
        amount: f64,
        subject: &ScienceSubject,
        transmission: f64,
    ) -> f64 {
        let credited = self.value_at(amount, subject, transmission, subject.collected);
        let after = accumulate(subject.collected, credited);
        self.value_at(amount, subject, transmission, after)
    }

    /// Credit the measurement to the subject and return the amount credited.
    pub fn commit(&self, amount: f64, subject: &mut ScienceSubject, transmission: f64) -> f64 {
        let credited = self.value_at(amount, subject, transmission, subject.collected);
        subject.collected = accumulate(subject.collected, credited);
        tracing::debug!(
            target: "rnd",
            subject = %subject.id,
            credited,
            collected = subject.collected,
            "science committed"
        );
        credited
    }

    fn value_at(
        &self,
        amount: f64,
        subject: &ScienceSubject,
        transmission: f64,
        collected: f64,
    ) -> f64 {
        let raw = self.reference_multiplier(amount, subject)
            * subject.base_value
            * subject.difficulty
            * finite_or_zero(transmission)
            * self.gain_multiplier;
        if !(raw > 0.0) || !raw.is_finite() {
            return 0.0;
        }
        let diminished = raw * remaining_fraction(collected, subject.science_cap);
        let headroom = (subject.science_cap - collected).max(0.0);
        diminished.min(headroom)
    }
}

/// The one routine that advances a collected total. `commit` and the
/// preview share it so the preview matches the post-commit state exactly.
fn accumulate(collected: f64, credited: f64) -> f64 {
    collected + credited
}

fn remaining_fraction(collected: f64, cap: f64) -> f64 {
    if !(cap > 0.0) {
        return 0.0;
    }
    (1.0 - collected / cap).max(0.0)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
