//! KPI listing page: fixed definitions shown next to the dashboard

use crate::kpi::Metric;

/// Definition of one KPI as presented to marketing users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiDefinition {
    pub metric: Metric,
    pub title: &'static str,
    pub formula: &'static str,
    pub interpretation: &'static str,
}

pub const PAGE_TITLE: &str = "KPI Marketing - Définitions & Interprétation";

pub const INTRO: &str = "Cette page présente les indicateurs clés utilisés dans le dashboard \
ainsi que leur interprétation métier.";

pub const DEFINITIONS: [KpiDefinition; 4] = [
    KpiDefinition {
        metric: Metric::Ctr,
        title: "CTR - Click Through Rate",
        formula: "CTR = clicks / impressions",
        interpretation: "Mesure l'attractivité d'une campagne et la pertinence du ciblage.",
    },
    KpiDefinition {
        metric: Metric::ConversionRate,
        title: "Taux de conversion",
        formula: "ConversionRate = conversions / clicks",
        interpretation: "Évalue l'efficacité du parcours utilisateur après le clic.",
    },
    KpiDefinition {
        metric: Metric::Cpc,
        title: "CPC - Cost Per Click",
        formula: "CPC = cost / clicks",
        interpretation: "Mesure le coût d'acquisition de trafic.",
    },
    KpiDefinition {
        metric: Metric::Cpa,
        title: "CPA - Cost Per Acquisition",
        formula: "CPA = cost / conversions",
        interpretation: "KPI central pour mesurer la rentabilité marketing.",
    },
];

/// Complementary indicator without a formula of its own
pub const CONVERSION_VOLUME_TITLE: &str = "KPI complémentaire - Volume de conversions";
pub const CONVERSION_VOLUME_NOTE: &str =
    "Permet d'identifier les canaux et segments les plus créateurs de valeur.";

/// Definition shown for `metric`
pub fn definition(metric: Metric) -> &'static KpiDefinition {
    match metric {
        Metric::Ctr => &DEFINITIONS[0],
        Metric::ConversionRate => &DEFINITIONS[1],
        Metric::Cpc => &DEFINITIONS[2],
        Metric::Cpa => &DEFINITIONS[3],
    }
}

/// Render the KPI listing page as plain text
pub fn render_page() -> String {
    let mut page = String::new();
    page.push_str(&format!("=== {} ===\n\n{}\n\n", PAGE_TITLE, INTRO));
    page.push_str("KPI utilisés\n");

    for (i, def) in Metric::ALL.into_iter().map(definition).enumerate() {
        page.push_str(&format!(
            "\n{}. {}\n   Formule : {}\n   Interprétation métier : {}\n",
            i + 1,
            def.title,
            def.formula,
            def.interpretation
        ));
    }

    page.push_str(&format!(
        "\n{}. {}\n   Interprétation métier : {}\n",
        DEFINITIONS.len() + 1,
        CONVERSION_VOLUME_TITLE,
        CONVERSION_VOLUME_NOTE
    ));
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_metric_has_a_definition() {
        for metric in Metric::ALL {
            assert_eq!(definition(metric).metric, metric);
        }
    }

    #[test]
    fn test_page_lists_formulas_and_volume_note() {
        let page = render_page();
        for def in DEFINITIONS {
            assert!(page.contains(def.formula));
            assert!(page.contains(def.interpretation));
        }
        assert!(page.contains("5. KPI complémentaire"));
        assert!(page.contains(CONVERSION_VOLUME_NOTE));
    }

    #[test]
    fn test_page_numbers_metrics_in_order() {
        let page = render_page();
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            let heading = format!("{}. {}", i + 1, definition(metric).title);
            assert!(page.contains(&heading), "missing {}", heading);
        }
    }
}
