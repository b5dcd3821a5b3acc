use crate::enforcer::PolicyEnforcer;
use crate::error::PolicyError;
use crate::rule::PolicyRuleSpec;
use crate::trigger::TriggerSpec;

pub const DISPENSING_SAFETY_RULE: &str = "dispensing_safety";

const SELF_IDENTIFICATION: &str =
    r"(?i:\b(?:i[’']m|i am|my name is|this is)\s+)\p{Lu}[\p{L}'-]+";
const ON_BEHALF_OF: &str = r"(?i:\bfor\s+)\p{Lu}[\p{L}'-]+\s+\p{Lu}[\p{L}'-]+";

/// Default rule table for the pharmacy assistant.
///
/// When a message both names a person and mentions a medication the pharmacy
/// carries, the reply must be grounded in the medication record and that
/// person's allergy record.
pub fn pharmacy_rules<I, S>(medication_names: I) -> Result<PolicyEnforcer, PolicyError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let rule = PolicyRuleSpec {
        name: DISPENSING_SAFETY_RULE.to_string(),
        description: Some(
            "Check the medication and the named person's allergies before discussing a medication for them."
                .to_string(),
        ),
        trigger: TriggerSpec::All {
            of: vec![
                TriggerSpec::Any {
                    of: vec![
                        TriggerSpec::matches(SELF_IDENTIFICATION),
                        TriggerSpec::matches(ON_BEHALF_OF),
                    ],
                },
                TriggerSpec::mentions_any(medication_names),
            ],
        },
        required_tools: vec![
            "get_medication_info".to_string(),
            "get_user_allergies".to_string(),
        ],
    };

    PolicyEnforcer::from_specs(&[rule])
}
