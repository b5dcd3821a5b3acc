use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::REFER_TO_PROFESSIONAL;
use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ArgumentKind, ArgumentSchema, ToolArguments};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Diagnosis,
    Treatment,
    DosageAdvice,
    InteractionConcern,
    SideEffectConcern,
    General,
}

impl QueryType {
    const NAMES: [&'static str; 6] = [
        "diagnosis",
        "treatment",
        "dosage_advice",
        "interaction_concern",
        "side_effect_concern",
        "general",
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Diagnosis => "diagnosis",
            Self::Treatment => "treatment",
            Self::DosageAdvice => "dosage_advice",
            Self::InteractionConcern => "interaction_concern",
            Self::SideEffectConcern => "side_effect_concern",
            Self::General => "general",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::Diagnosis => "I cannot provide medical diagnosis. If you're experiencing symptoms or health concerns, please consult with a healthcare professional who can properly evaluate your condition.",
            Self::Treatment => "I cannot recommend specific treatments or tell you whether you should take a medication. Please speak with your doctor or pharmacist who can provide personalized medical advice based on your health history.",
            Self::DosageAdvice => "I cannot provide personalized dosage recommendations. The correct dosage depends on many individual factors. Please consult your doctor or pharmacist for dosage guidance specific to your situation.",
            Self::InteractionConcern => "While I can provide general information about drug interactions, I cannot assess your specific situation. Please speak with your pharmacist or doctor about potential interactions with your current medications.",
            Self::SideEffectConcern => "If you're experiencing concerning symptoms or side effects from a medication, please contact your healthcare provider immediately. For emergencies, call your local emergency number.",
            Self::General => "This question requires professional medical advice that I cannot provide. Please consult with a healthcare professional for personalized guidance.",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReferralRequest {
    query_type: QueryType,
    #[serde(default)]
    reason: Option<String>,
}

/// Produces a referral message; touches no records.
pub struct ReferToProfessionalTool;

#[async_trait]
impl Tool for ReferToProfessionalTool {
    fn name(&self) -> &str {
        REFER_TO_PROFESSIONAL
    }

    fn description(&self) -> &str {
        "Refer the customer to a healthcare professional when they ask for medical advice, diagnosis, treatment recommendations, or personalized dosage advice, e.g. 'Should I take this?', 'What's wrong with me?', 'How much should I take?'."
    }

    fn arguments(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .required(
                "query_type",
                ArgumentKind::String,
                "Type of query that requires professional referral",
            )
            .one_of(&QueryType::NAMES)
            .optional(
                "reason",
                ArgumentKind::String,
                "Optional brief explanation of why referral is needed",
            )
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let request: ReferralRequest = args.parse()?;

        let mut message = request.query_type.message().to_string();
        if let Some(reason) = request.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            message.push_str("\n\nNote: ");
            message.push_str(reason);
        }

        Ok(json!({
            "success": true,
            "referral_needed": true,
            "query_type": request.query_type.as_str(),
            "message": message,
            "resources": [
                {"type": "Emergency", "description": "For medical emergencies, call emergency services immediately"},
                {"type": "Pharmacist", "description": "Speak with our in-store pharmacist for medication questions"},
                {"type": "Doctor", "description": "Contact your healthcare provider for medical advice and treatment"},
                {"type": "Poison Control", "description": "For medication overdose or poisoning concerns, contact Poison Control"},
            ],
            "disclaimer": "I can only provide factual information about medications. I cannot diagnose, treat, or provide medical advice.",
        }))
    }
}
