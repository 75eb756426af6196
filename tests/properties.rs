use fair_lending::analysis::{
    GroupStats, PricingRequest, TestKind, UnderwritingRequest, pricing_report,
    underwriting_report,
};
use fair_lending::config::AnalysisConfig;
use fair_lending::data::filter::{Filter, Selection, filter};
use fair_lending::data::model::{Column, ColumnType, Table, Value};
use proptest::prelude::*;

const GROUPS: [&str; 4] = ["Asian", "Black", "Hispanic", "White"];
const LOAN_TYPES: [&str; 3] = ["Auto", "Mortgage", "Personal"];
const DECISIONS: [&str; 3] = ["Approved", "Denied", "Withdrawn"];

fn pricing_rows() -> impl Strategy<Value = Vec<(usize, usize, f64)>> {
    prop::collection::vec((0..GROUPS.len(), 0..LOAN_TYPES.len(), 0.5f64..20.0), 0..60)
}

fn decision_rows() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..GROUPS.len(), 0..DECISIONS.len()), 0..80)
}

fn pricing_table(rows: &[(usize, usize, f64)]) -> Table {
    Table::new(
        vec![
            Column::new("Race", ColumnType::Categorical),
            Column::new("LoanType", ColumnType::Categorical),
            Column::new("AIP", ColumnType::Numeric),
        ],
        rows.iter()
            .map(|&(g, l, v)| vec![GROUPS[g].into(), LOAN_TYPES[l].into(), v.into()])
            .collect(),
    )
    .unwrap()
}

fn decision_table(rows: &[(usize, usize)]) -> Table {
    Table::new(
        vec![
            Column::new("Race", ColumnType::Categorical),
            Column::new("Decision", ColumnType::Categorical),
        ],
        rows.iter()
            .map(|&(g, d)| vec![Value::text(GROUPS[g]), Value::text(DECISIONS[d])])
            .collect(),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn group_counts_sum_to_population(rows in pricing_rows()) {
        let report = pricing_report(&pricing_table(&rows), &PricingRequest::new("Race", "AIP")).unwrap();
        let total: usize = report.groups.iter().map(|g| g.count).sum();
        prop_assert_eq!(total, rows.len());
        prop_assert_eq!(report.population, rows.len());
    }

    #[test]
    fn weighted_deviations_reconcile_to_zero(rows in pricing_rows()) {
        let report = pricing_report(&pricing_table(&rows), &PricingRequest::new("Race", "AIP")).unwrap();
        if report.baseline.is_some() {
            let weighted: f64 = report
                .groups
                .iter()
                .map(|g| g.count as f64 * g.deviation.unwrap())
                .sum();
            prop_assert!(weighted.abs() < 1e-6, "weighted deviation sum {}", weighted);
        }
    }

    #[test]
    fn test_kind_follows_group_count(rows in pricing_rows()) {
        let report = pricing_report(&pricing_table(&rows), &PricingRequest::new("Race", "AIP")).unwrap();
        if report.groups.len() < 2 {
            prop_assert!(report.test.is_none());
        }
        if let Some(test) = &report.test {
            let expected = if report.groups.len() == 2 { TestKind::WelchT } else { TestKind::Anova };
            prop_assert_eq!(test.kind, expected);
            prop_assert!((0.0..=1.0).contains(&test.p_value));
        }
    }

    #[test]
    fn row_order_does_not_change_the_report(rows in pricing_rows()) {
        let mut reversed = rows.clone();
        reversed.reverse();
        let request = PricingRequest::new("Race", "AIP");
        let a = pricing_report(&pricing_table(&rows), &request).unwrap();
        let b = pricing_report(&pricing_table(&reversed), &request).unwrap();

        let keys = |r: &fair_lending::analysis::DisparityReport| {
            r.groups.iter().map(|g| (g.key.clone(), g.count)).collect::<Vec<_>>()
        };
        prop_assert_eq!(keys(&a), keys(&b));
        for (ga, gb) in a.groups.iter().zip(&b.groups) {
            prop_assert!((ga.metric - gb.metric).abs() < 1e-9);
        }
        prop_assert_eq!(a.test.is_some(), b.test.is_some());
        if let (Some(ta), Some(tb)) = (&a.test, &b.test) {
            prop_assert!((ta.p_value - tb.p_value).abs() < 1e-6);
        }
    }

    #[test]
    fn approval_proportions_sum_to_one(rows in decision_rows()) {
        let report = underwriting_report(
            &decision_table(&rows),
            &UnderwritingRequest::new("Race", "Decision", "Approved"),
            &AnalysisConfig::default(),
        )
        .unwrap();
        for group in &report.groups {
            let GroupStats::Categorical(s) = &group.stats else {
                panic!("underwriting groups are categorical");
            };
            let total: f64 = s.categories.values().map(|c| c.proportion).sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
            prop_assert!((0.0..=1.0).contains(&group.metric));
        }
        if let Some(test) = &report.test {
            prop_assert!((0.0..=1.0).contains(&test.p_value));
            prop_assert!(test.statistic >= 0.0);
        }
    }

    #[test]
    fn selecting_everything_is_a_no_op(rows in pricing_rows()) {
        let table = pricing_table(&rows);
        let all: Filter = [
            ("Race".to_string(), Selection::All),
            ("LoanType".to_string(), Selection::All),
        ]
        .into_iter()
        .collect();
        prop_assert_eq!(filter(&table, &all).unwrap(), table.clone());

        let every_type: Filter = [(
            "LoanType".to_string(),
            LOAN_TYPES.iter().map(|&l| Value::text(l)).collect::<Selection>(),
        )]
        .into_iter()
        .collect();
        prop_assert_eq!(filter(&table, &every_type).unwrap(), table);
    }
}
