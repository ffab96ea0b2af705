//! Response plan generation. Pure and deterministic: the same analysis always
//! yields a byte-identical plan, so it is cacheable and replayable for free.

use crisiswatch_common::{AiAnalysis, PlanPhase, PlanPhases, ResponsePlan, RiskLevel};

// --- Priority tiers ---

/// Operational priority derived from the analyzed risk level. Drives the
/// per-person cost assumption and the activity mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

impl PriorityTier {
    pub fn from_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Critical => PriorityTier::Tier1,
            RiskLevel::High => PriorityTier::Tier2,
            RiskLevel::Medium => PriorityTier::Tier3,
            RiskLevel::Low | RiskLevel::Unknown => PriorityTier::Tier4,
        }
    }

    /// Planning-level unit cost in integer USD per affected person.
    fn cost_per_person(self) -> u64 {
        match self {
            PriorityTier::Tier1 => 1_200,
            PriorityTier::Tier2 => 900,
            PriorityTier::Tier3 => 600,
            PriorityTier::Tier4 => 350,
        }
    }

    fn slug(self) -> &'static str {
        match self {
            PriorityTier::Tier1 => "tier1",
            PriorityTier::Tier2 => "tier2",
            PriorityTier::Tier3 => "tier3",
            PriorityTier::Tier4 => "tier4",
        }
    }
}

// --- Phase constants ---

const EMERGENCY_SHARE: u64 = 50;
const STABILIZATION_SHARE: u64 = 30;
const INTEGRATION_SHARE: u64 = 20;

// People served per staff member, by phase. Emergency is the most
// labor-intensive.
const EMERGENCY_COVERAGE: u64 = 500;
const STABILIZATION_COVERAGE: u64 = 1_000;
const INTEGRATION_COVERAGE: u64 = 2_000;

/// Expand one analysis into a three-phase response plan.
///
/// Integer arithmetic throughout. Emergency and stabilization budgets are
/// floored percentages; integration takes the remainder, so the three phases
/// sum to `total_cost` exactly for every input.
pub fn generate(analysis: &AiAnalysis) -> ResponsePlan {
    let tier = PriorityTier::from_risk(analysis.risk_assessment);
    let population = analysis.displacement_prediction.estimated_affected;
    let cost_per_person = tier.cost_per_person();
    // The population figure is model-supplied, so the arithmetic must hold
    // up under absurd inputs rather than overflow.
    let total_cost = population.saturating_mul(cost_per_person);

    let emergency_budget = (total_cost as u128 * EMERGENCY_SHARE as u128 / 100) as u64;
    let stabilization_budget = (total_cost as u128 * STABILIZATION_SHARE as u128 / 100) as u64;
    let integration_budget = total_cost - emergency_budget - stabilization_budget;

    ResponsePlan {
        plan_id: format!("{}-{}", country_slug(&analysis.country), tier.slug()),
        country: analysis.country.clone(),
        target_population: population,
        total_cost,
        phases: PlanPhases {
            emergency: PlanPhase {
                name: "Emergency Response".to_string(),
                share_pct: EMERGENCY_SHARE as u8,
                budget: emergency_budget,
                activities: emergency_activities(tier),
                staff: staff_for(population, EMERGENCY_COVERAGE),
            },
            stabilization: PlanPhase {
                name: "Stabilization".to_string(),
                share_pct: STABILIZATION_SHARE as u8,
                budget: stabilization_budget,
                activities: stabilization_activities(tier),
                staff: staff_for(population, STABILIZATION_COVERAGE),
            },
            integration: PlanPhase {
                name: "Integration".to_string(),
                share_pct: INTEGRATION_SHARE as u8,
                budget: integration_budget,
                activities: integration_activities(tier),
                staff: staff_for(population, INTEGRATION_COVERAGE),
            },
        },
        cost_per_person,
    }
}

/// Ceiling division so any nonzero caseload gets at least one staff member.
fn staff_for(population: u64, coverage: u64) -> u64 {
    population.div_ceil(coverage)
}

fn country_slug(country: &str) -> String {
    country
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn emergency_activities(tier: PriorityTier) -> Vec<String> {
    let mut activities = vec![
        "Emergency shelter and non-food items".to_string(),
        "Food and safe water distribution".to_string(),
        "Mobile health and trauma care".to_string(),
    ];
    if matches!(tier, PriorityTier::Tier1 | PriorityTier::Tier2) {
        activities.push("Protection screening at displacement corridors".to_string());
    }
    activities
}

fn stabilization_activities(tier: PriorityTier) -> Vec<String> {
    let mut activities = vec![
        "Transitional shelter upgrades".to_string(),
        "Cash assistance and market support".to_string(),
        "Primary health and nutrition services".to_string(),
    ];
    if matches!(tier, PriorityTier::Tier1) {
        activities.push("Family tracing and reunification".to_string());
    }
    activities
}

fn integration_activities(tier: PriorityTier) -> Vec<String> {
    let mut activities = vec![
        "Livelihood and vocational programs".to_string(),
        "Education access for displaced children".to_string(),
    ];
    if matches!(tier, PriorityTier::Tier3 | PriorityTier::Tier4) {
        activities.push("Community resilience planning".to_string());
    } else {
        activities.push("Durable housing and land mediation".to_string());
    }
    activities
}
