/// Property-based tests using proptest
/// Tests invariants that should hold for all leads and all criteria values
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_lead_scoring_api::models::{CriteriaScores, Lead, LeadStatus};
use rust_lead_scoring_api::scoring::criteria::CriteriaCalculator;
use rust_lead_scoring_api::scoring::tables::ScoringTables;
use rust_lead_scoring_api::scoring::weights::WeightedAggregator;
use rust_lead_scoring_api::scoring::ScoringEngine;

fn status_strategy() -> impl Strategy<Value = LeadStatus> {
    prop_oneof![
        Just("new".to_string()),
        Just("contatado".to_string()),
        Just("qualified".to_string()),
        Just("agendado".to_string()),
        Just("proposal".to_string()),
        Just("converted".to_string()),
        Just("fechado".to_string()),
        Just("lost".to_string()),
        Just("cancelado".to_string()),
        "\\PC{0,12}",
    ]
    .prop_map(LeadStatus::from)
}

prop_compose! {
    fn arb_lead()(
        name in "\\PC{0,30}",
        business_name in "\\PC{0,50}",
        city in prop::sample::select(vec!["São Paulo", "Recife", "Santos", "Nowhereville", ""]),
        niche in proptest::option::of("\\PC{0,20}"),
        phone in proptest::option::of("[0-9()+ -]{0,20}"),
        email in proptest::option::of("[a-z0-9.@]{0,30}"),
        status in status_strategy(),
        source in proptest::option::of(prop::sample::select(vec!["website", "Referral", "manual", "tiktok"])),
        whatsapp_verified in proptest::bool::ANY,
        whatsapp_exists in proptest::bool::ANY,
        whatsapp_number in proptest::option::of("[0-9]{0,13}"),
        age_minutes in -600i64..=200_000i64,
    ) -> Lead {
        Lead {
            id: "lead".to_string(),
            name,
            business_name,
            city: city.to_string(),
            niche,
            phone,
            email,
            status,
            source: source.map(str::to_string),
            whatsapp_verified,
            whatsapp_exists,
            whatsapp_number,
            created_at: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
                - Duration::minutes(age_minutes),
        }
    }
}

prop_compose! {
    fn arb_criteria()(values in proptest::array::uniform11(0.0f64..=10.0)) -> CriteriaScores {
        CriteriaScores {
            phone: values[0],
            email: values[1],
            business_name: values[2],
            city: values[3],
            niche: values[4],
            response_time: values[5],
            engagement: values[6],
            whatsapp: values[7],
            source: values[8],
            completeness: values[9],
            lead_age: values[10],
        }
    }
}

// Property: every criterion stays within 0-10
proptest! {
    #[test]
    fn criteria_always_within_bounds(lead in arb_lead()) {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

        let criteria = calc.calculate(&lead, now);
        for value in criteria.values() {
            prop_assert!((0.0..=10.0).contains(&value), "out of range: {:?}", criteria);
        }
    }

    #[test]
    fn business_name_scoring_never_panics(name in "\\PC*") {
        let tables = ScoringTables::default();
        let score = CriteriaCalculator::new(&tables).business_name_score(&name);
        prop_assert!((1.0..=10.0).contains(&score) || score == 2.0);
    }
}

// Property: final scores are bounded and have one decimal place
proptest! {
    #[test]
    fn final_score_bounded_with_one_decimal(lead in arb_lead()) {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let outcome = ScoringEngine::default().score_at(&[lead], &[], now);
        let score = outcome.scored_leads[0].score;

        prop_assert!((0.0..=10.0).contains(&score));
        prop_assert!(((score * 10.0).round() - score * 10.0).abs() < 1e-9);
    }
}

// Property: the aggregator is monotonic in each criterion
proptest! {
    #[test]
    fn aggregator_is_monotonic(
        criteria in arb_criteria(),
        index in 0usize..11,
        bump in 0.0f64..=10.0,
    ) {
        let aggregator = WeightedAggregator::default();
        let before = aggregator.score(&criteria);

        let mut raised = criteria;
        let field = match index {
            0 => &mut raised.phone,
            1 => &mut raised.email,
            2 => &mut raised.business_name,
            3 => &mut raised.city,
            4 => &mut raised.niche,
            5 => &mut raised.response_time,
            6 => &mut raised.engagement,
            7 => &mut raised.whatsapp,
            8 => &mut raised.source,
            9 => &mut raised.completeness,
            _ => &mut raised.lead_age,
        };
        *field = (*field + bump).min(10.0);

        let after = aggregator.score(&raised);
        prop_assert!(after >= before, "{} -> {} after raising criterion {}", before, after, index);
    }
}
