use std::collections::HashSet;

use crate::core::overlap::availability_overlap_hours;
use crate::models::{Requester, RouteRequest, Worker};

/// Live session count at which a worker is considered under capacity pressure
const CAPACITY_PRESSURE_THRESHOLD: i64 = 8;

/// Calculate the affinity score for one worker against a session request
///
/// Returns None when the worker does not speak the requested language; an
/// ineligible worker has no score at all and never reaches the ranking.
///
/// Scoring formula:
/// score = (
///     2.0 * expertise +            # 2.0 * jaccard(topics, expertise_tags), topical fit dominates
///     1.0 * domain +               # 1.5 * jaccard(domain_tags, expertise_tags)
///     budget_fit +                 # +0.5 within budget, scaled penalty over it
///     speed_fit +                  # +0.5 within SLA, scaled penalty over it
///     empathy +                    # empathy_score, weighted up for sensitive sessions
///     0.5 * reliability +
///     -0.08 * live_sessions +      # linear load penalty
///     capacity_pressure +          # -2.0 at 8 or more live sessions
///     availability_penalty         # -1.0 when schedules never overlap
/// )
pub fn score_worker(
    requester: &Requester,
    request: &RouteRequest,
    worker: &Worker,
    live_sessions: i64,
) -> Option<f64> {
    // Hard eligibility gate: language mismatch disqualifies outright
    if !worker.speaks(&request.language) {
        return None;
    }

    let overlap = availability_overlap_hours(&requester.availability, &worker.availability);
    let availability_penalty = if overlap > 0.0 { 0.0 } else { -1.0 };

    let capacity_pressure = if live_sessions >= CAPACITY_PRESSURE_THRESHOLD {
        -2.0
    } else {
        0.0
    };

    let expertise = 2.0 * jaccard(&request.topics, &worker.expertise_tags);
    let domain = 1.5 * jaccard(&requester.domain_tags, &worker.expertise_tags);

    let budget_fit = budget_fit(worker.rate, request.budget);
    let speed_fit = speed_fit(worker.avg_session_min, request.sla_min);

    let empathy_weight = if request.sensitivity { 1.0 } else { 0.3 };
    let empathy = empathy_weight * worker.empathy_score;

    let load_penalty = -0.08 * live_sessions as f64;
    let reliability_bonus = 0.5 * worker.reliability;

    Some(
        2.0 * expertise
            + 1.0 * domain
            + budget_fit
            + speed_fit
            + empathy
            + reliability_bonus
            + load_penalty
            + capacity_pressure
            + availability_penalty,
    )
}

/// Budget fit: a flat reward within budget, a penalty scaled by the relative
/// overrun otherwise. The denominator is floored at 20.0 so tiny budgets do
/// not explode the penalty.
#[inline]
fn budget_fit(rate: f64, budget: f64) -> f64 {
    if rate <= budget {
        0.5
    } else {
        -1.5 * (rate - budget) / budget.max(20.0)
    }
}

/// Speed fit: a flat reward for workers whose average session fits the SLA,
/// a penalty scaled by the relative overrun otherwise. Floored at 10 minutes.
#[inline]
fn speed_fit(avg_session_min: i32, sla_min: i64) -> f64 {
    let avg = i64::from(avg_session_min);
    if avg <= sla_min {
        0.5
    } else {
        -0.3 * (avg - sla_min) as f64 / sla_min.max(10) as f64
    }
}

/// Jaccard similarity of two tag lists
///
/// Duplicates are ignored. Returns 0.0 when either side is empty, so absent
/// tags read as "no signal" rather than a perfect or undefined match.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    intersection as f64 / union as f64
}
