//! Commission resolver
//!
//! Resolves the commission a consultant earns on a sale. Rules of the
//! consultant's commercial profile are searched by specificity and the
//! first match wins:
//! 1. offer (retailer + offer name, optionally one access tariff)
//! 2. access tariff
//! 3. retailer
//! 4. the profile's default percentage
//!
//! The resolved percentage scales the principal commission in force; it is
//! never added to it. Fee-based rules pay a share of the applied fees
//! instead of a share of the bill.

use crate::core::{
    CommercialProfile, CommissionRequest, CommissionResult, CommissionRule, Consultant, Error,
    FeeInputs, FeeShare, MatchKind, PrincipalCommission, Result, Retailer, RuleScope,
};
use crate::i18n::I18n;

/// Resolves commissions against one snapshot of profiles and principal commission history
pub struct CommissionResolver<'a> {
    profiles: &'a [CommercialProfile],
    principal_history: &'a [PrincipalCommission],
    retailers: &'a [Retailer],
    i18n: &'a I18n,
}

/// The rule a request matched, or the profile default
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleMatch<'a> {
    Rule(MatchKind, &'a CommissionRule),
    ProfileDefault(f64),
}

impl<'a> RuleMatch<'a> {
    pub fn kind(&self) -> MatchKind {
        match self {
            RuleMatch::Rule(kind, _) => *kind,
            RuleMatch::ProfileDefault(_) => MatchKind::ProfileDefault,
        }
    }

    pub fn percentage(&self) -> f64 {
        match self {
            RuleMatch::Rule(_, rule) => rule.percentage,
            RuleMatch::ProfileDefault(percentage) => *percentage,
        }
    }

    fn fee_share(&self) -> Option<FeeShare> {
        match self {
            RuleMatch::Rule(_, rule) => rule.fee_share,
            RuleMatch::ProfileDefault(_) => None,
        }
    }
}

impl<'a> CommissionResolver<'a> {
    pub fn new(
        profiles: &'a [CommercialProfile],
        principal_history: &'a [PrincipalCommission],
        retailers: &'a [Retailer],
        i18n: &'a I18n,
    ) -> Self {
        Self {
            profiles,
            principal_history,
            retailers,
            i18n,
        }
    }

    /// Resolve the commission `consultant` earns for `request`
    pub fn resolve(
        &self,
        consultant: &Consultant,
        request: &CommissionRequest,
    ) -> Result<CommissionResult> {
        let profile = consultant
            .profile_id
            .and_then(|id| self.profiles.iter().find(|profile| profile.id == id))
            .ok_or(Error::NoProfile {
                consultant_id: consultant.id,
            })?;

        let principal =
            active_principal(self.principal_history).ok_or(Error::NoPrincipalCommission)?;

        let matched = find_rule(profile, request);
        let percentage = matched.percentage();

        let fee_based = matched.fee_share().zip(request.fee_inputs);
        let amount = match fee_based {
            Some((share, inputs)) => fee_commission(&share, &inputs),
            None => {
                if matched.fee_share().is_some() {
                    log::debug!(
                        "Fee-based rule matched for consultant {} without fee inputs, using bill percentage",
                        consultant.id
                    );
                }
                let factor = (principal.percentage / 100.0) * (percentage / 100.0);
                request.annual_bill * factor
            }
        };

        let fee_share = fee_based.map(|(share, _)| share);
        let explanation = self.explain(profile, request, &matched, fee_share, principal);

        log::debug!(
            "Commission for consultant {} on '{}': {} ({}%) -> {:.2}",
            consultant.id,
            request.offer_name,
            matched.kind().as_str(),
            percentage,
            amount
        );

        Ok(CommissionResult {
            kind: matched.kind(),
            percentage,
            principal_percentage: principal.percentage,
            amount,
            fee_based: fee_based.is_some(),
            explanation,
        })
    }

    fn explain(
        &self,
        profile: &CommercialProfile,
        request: &CommissionRequest,
        matched: &RuleMatch<'_>,
        fee_share: Option<FeeShare>,
        principal: &PrincipalCommission,
    ) -> String {
        let percentage = matched.percentage().to_string();
        let rule = match matched {
            RuleMatch::Rule(MatchKind::Offer, _) => self.i18n.format(
                "commission.kind.offer",
                &[("offer", request.offer_name.clone()), ("percentage", percentage)],
            ),
            RuleMatch::Rule(MatchKind::Tariff, _) => self.i18n.format(
                "commission.kind.tariff",
                &[("access_tariff", request.access_tariff.clone()), ("percentage", percentage)],
            ),
            RuleMatch::Rule(_, _) => self.i18n.format(
                "commission.kind.retailer",
                &[("retailer", self.retailer_name(request.retailer_id)), ("percentage", percentage)],
            ),
            RuleMatch::ProfileDefault(_) => self.i18n.format(
                "commission.kind.total",
                &[("profile", profile.name.clone()), ("percentage", percentage)],
            ),
        };

        let rule = match fee_share {
            Some(share) => self.i18n.format(
                "commission.fee_based",
                &[
                    ("rule", rule),
                    ("power_percent", share.power_percent.unwrap_or(0.0).to_string()),
                    ("energy_percent", share.energy_percent.unwrap_or(0.0).to_string()),
                ],
            ),
            None => rule,
        };

        self.i18n.format(
            "commission.explanation",
            &[("rule", rule), ("principal", principal.percentage.to_string())],
        )
    }

    fn retailer_name(&self, retailer_id: i64) -> String {
        self.retailers
            .iter()
            .find(|retailer| retailer.id == retailer_id)
            .map(|retailer| retailer.name.clone())
            .unwrap_or_else(|| retailer_id.to_string())
    }
}

/// The active principal commission with the latest activation date
pub fn active_principal(history: &[PrincipalCommission]) -> Option<&PrincipalCommission> {
    history
        .iter()
        .filter(|record| record.active)
        .max_by_key(|record| record.activated_on)
}

/// First active rule matching `request`, by specificity, else the profile default
pub fn find_rule<'a>(profile: &'a CommercialProfile, request: &CommissionRequest) -> RuleMatch<'a> {
    let rules = &profile.rules;
    let active = move || rules.iter().filter(|rule| rule.active);

    let offer = active().find(|rule| match &rule.scope {
        RuleScope::Offer {
            retailer_id,
            offer_name,
            access_tariff,
        } => {
            *retailer_id == request.retailer_id
                && *offer_name == request.offer_name
                && access_tariff
                    .as_ref()
                    .map_or(true, |code| *code == request.access_tariff)
        }
        _ => false,
    });
    if let Some(rule) = offer {
        return RuleMatch::Rule(MatchKind::Offer, rule);
    }

    let tariff = active().find(|rule| {
        matches!(&rule.scope, RuleScope::AccessTariff { access_tariff } if *access_tariff == request.access_tariff)
    });
    if let Some(rule) = tariff {
        return RuleMatch::Rule(MatchKind::Tariff, rule);
    }

    let retailer = active().find(|rule| {
        matches!(&rule.scope, RuleScope::Retailer { retailer_id } if *retailer_id == request.retailer_id)
    });
    if let Some(rule) = retailer {
        return RuleMatch::Rule(MatchKind::Retailer, rule);
    }

    RuleMatch::ProfileDefault(profile.default_percentage)
}

/// Power fee share plus energy fee share; replaces the bill percentage entirely
fn fee_commission(share: &FeeShare, inputs: &FeeInputs) -> f64 {
    let power = inputs.contracted_power_sum
        * inputs.power_fee
        * share.power_percent.unwrap_or(0.0)
        / 100.0;
    let energy = inputs.annual_consumption
        * inputs.energy_fee
        * share.energy_percent.unwrap_or(0.0)
        / 100.0;
    power + energy
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn offer_rule(percentage: f64) -> CommissionRule {
        CommissionRule {
            scope: RuleScope::Offer {
                retailer_id: 3,
                offer_name: "Tarifa Luz Fija".to_string(),
                access_tariff: None,
            },
            percentage,
            active: true,
            fee_share: None,
        }
    }

    fn tariff_rule(percentage: f64) -> CommissionRule {
        CommissionRule {
            scope: RuleScope::AccessTariff {
                access_tariff: "2.0TD".to_string(),
            },
            percentage,
            active: true,
            fee_share: None,
        }
    }

    fn retailer_rule(percentage: f64) -> CommissionRule {
        CommissionRule {
            scope: RuleScope::Retailer { retailer_id: 3 },
            percentage,
            active: true,
            fee_share: None,
        }
    }

    fn profile(rules: Vec<CommissionRule>) -> CommercialProfile {
        CommercialProfile {
            id: 1,
            name: "Senior".to_string(),
            default_percentage: 40.0,
            rules,
        }
    }

    fn principal(percentage: f64, day: u32, active: bool) -> PrincipalCommission {
        PrincipalCommission {
            id: None,
            percentage,
            activated_on: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            active,
        }
    }

    fn consultant() -> Consultant {
        Consultant {
            id: 11,
            name: "Marta".to_string(),
            profile_id: Some(1),
        }
    }

    fn request() -> CommissionRequest {
        CommissionRequest {
            retailer_id: 3,
            offer_name: "Tarifa Luz Fija".to_string(),
            access_tariff: "2.0TD".to_string(),
            annual_bill: 1000.0,
            fee_inputs: None,
        }
    }

    fn resolve(rules: Vec<CommissionRule>) -> Result<CommissionResult> {
        let profiles = vec![profile(rules)];
        let history = vec![principal(10.0, 1, true)];
        let retailers = vec![Retailer { id: 3, name: "Iberluz".to_string() }];
        let i18n = I18n::new("en");
        CommissionResolver::new(&profiles, &history, &retailers, &i18n)
            .resolve(&consultant(), &request())
    }

    fn all_levels() -> Vec<CommissionRule> {
        vec![retailer_rule(70.0), tariff_rule(60.0), offer_rule(50.0)]
    }

    #[test]
    fn test_offer_rule_wins() {
        let result = resolve(all_levels()).unwrap();

        assert_eq!(result.kind, MatchKind::Offer);
        assert_eq!(result.percentage, 50.0);
        // 1000 x 10% x 50%
        assert!((result.amount - 50.0).abs() < EPS);
        assert!(!result.fee_based);
    }

    #[test]
    fn test_falls_back_to_tariff_rule() {
        let result = resolve(vec![retailer_rule(70.0), tariff_rule(60.0)]).unwrap();

        assert_eq!(result.kind, MatchKind::Tariff);
        assert!((result.amount - 60.0).abs() < EPS);
    }

    #[test]
    fn test_falls_back_to_retailer_rule() {
        let result = resolve(vec![retailer_rule(70.0)]).unwrap();

        assert_eq!(result.kind, MatchKind::Retailer);
        assert!((result.amount - 70.0).abs() < EPS);
    }

    #[test]
    fn test_falls_back_to_profile_default() {
        let result = resolve(Vec::new()).unwrap();

        assert_eq!(result.kind, MatchKind::ProfileDefault);
        assert_eq!(result.percentage, 40.0);
        assert!((result.amount - 40.0).abs() < EPS);
    }

    #[test]
    fn test_inactive_rule_is_skipped() {
        let mut offer = offer_rule(50.0);
        offer.active = false;

        let result = resolve(vec![offer, retailer_rule(70.0)]).unwrap();
        assert_eq!(result.kind, MatchKind::Retailer);
    }

    #[test]
    fn test_offer_rule_access_tariff_must_match_when_set() {
        let mut offer = offer_rule(50.0);
        offer.scope = RuleScope::Offer {
            retailer_id: 3,
            offer_name: "Tarifa Luz Fija".to_string(),
            access_tariff: Some("3.0TD".to_string()),
        };

        let result = resolve(vec![offer.clone(), tariff_rule(60.0)]).unwrap();
        assert_eq!(result.kind, MatchKind::Tariff);

        offer.scope = RuleScope::Offer {
            retailer_id: 3,
            offer_name: "Tarifa Luz Fija".to_string(),
            access_tariff: Some("2.0TD".to_string()),
        };
        let result = resolve(vec![offer, tariff_rule(60.0)]).unwrap();
        assert_eq!(result.kind, MatchKind::Offer);
    }

    #[test]
    fn test_fee_based_formula_replaces_bill_percentage() {
        let mut offer = offer_rule(50.0);
        offer.fee_share = Some(FeeShare {
            energy_percent: Some(50.0),
            power_percent: Some(50.0),
        });
        let profiles = vec![profile(vec![offer])];
        let history = vec![principal(10.0, 1, true)];
        let i18n = I18n::new("en");
        let resolver = CommissionResolver::new(&profiles, &history, &[], &i18n);

        let mut request = request();
        request.fee_inputs = Some(FeeInputs {
            contracted_power_sum: 10.0,
            power_fee: 2.0,
            annual_consumption: 1000.0,
            energy_fee: 0.01,
        });

        let result = resolver.resolve(&consultant(), &request).unwrap();
        // 10 x 2 x 0.5 + 1000 x 0.01 x 0.5
        assert!((result.amount - 15.0).abs() < EPS);
        assert!(result.fee_based);

        request.annual_bill = 99_999.0;
        let result = resolver.resolve(&consultant(), &request).unwrap();
        assert!((result.amount - 15.0).abs() < EPS);
    }

    #[test]
    fn test_fee_based_rule_without_inputs_uses_bill_percentage() {
        let mut offer = offer_rule(50.0);
        offer.fee_share = Some(FeeShare {
            energy_percent: Some(50.0),
            power_percent: Some(50.0),
        });

        let result = resolve(vec![offer]).unwrap();
        assert!(!result.fee_based);
        assert!((result.amount - 50.0).abs() < EPS);
    }

    #[test]
    fn test_no_profile_assigned() {
        let profiles = vec![profile(Vec::new())];
        let history = vec![principal(10.0, 1, true)];
        let i18n = I18n::new("en");
        let resolver = CommissionResolver::new(&profiles, &history, &[], &i18n);

        let mut consultant = consultant();
        consultant.profile_id = None;
        assert!(matches!(
            resolver.resolve(&consultant, &request()),
            Err(Error::NoProfile { consultant_id: 11 })
        ));

        consultant.profile_id = Some(99);
        assert!(matches!(
            resolver.resolve(&consultant, &request()),
            Err(Error::NoProfile { .. })
        ));
    }

    #[test]
    fn test_no_principal_commission() {
        let profiles = vec![profile(Vec::new())];
        let history = vec![principal(10.0, 1, false)];
        let i18n = I18n::new("en");
        let resolver = CommissionResolver::new(&profiles, &history, &[], &i18n);

        assert!(matches!(
            resolver.resolve(&consultant(), &request()),
            Err(Error::NoPrincipalCommission)
        ));
    }

    #[test]
    fn test_latest_active_principal_applies() {
        let history = vec![
            principal(10.0, 1, true),
            principal(30.0, 20, false),
            principal(20.0, 10, true),
        ];

        assert_eq!(active_principal(&history).map(|p| p.percentage), Some(20.0));

        // Same activation date: the later record wins
        let mut history = history;
        history.push(principal(25.0, 10, true));
        assert_eq!(active_principal(&history).map(|p| p.percentage), Some(25.0));
    }

    #[test]
    fn test_explanation_names_rule_and_principal() {
        let result = resolve(vec![retailer_rule(70.0)]).unwrap();

        assert_eq!(
            result.explanation,
            "Retailer rule for Iberluz (70%), over principal commission 10%"
        );
    }
}
