//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 请求中带有序列 JSON 结构（"poses"）时返回一套固定的 JSON 序列，标题取自用户输入；
//! 否则视为引导词请求，返回一段以 "Namaste" 结尾的固定引导词。

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient;

impl MockLlmClient {
    fn canned_sequence(intent: &str) -> String {
        let focus = intent.trim();
        let focus = if focus.is_empty() { "balance" } else { focus };
        serde_json::json!({
            "title": format!("Flow for {focus}"),
            "description": "A gentle warmup, a steady peak and a quiet cooldown.",
            "poses": [
                {
                    "id": "cat-cow", "name": "Cat-Cow Stretch", "category": "Kneeling",
                    "duration": "2 mins", "description": "Flow between arched and rounded spine.",
                    "benefits": "Warms up the spine.", "breathingGuidance": "Inhale to arch, exhale to round."
                },
                {
                    "id": "low-lunge-twist", "name": "Low Lunge Twist", "category": "Kneeling",
                    "duration": "45s each side", "description": "Back knee down, rotate toward the front leg.",
                    "benefits": "Opens hip flexors and mobilises the thoracic spine.",
                    "breathingGuidance": "Lengthen on the inhale, twist on the exhale.",
                    "imagePrompt": "Minimal line illustration of a low lunge twist yoga pose"
                },
                {
                    "id": "down-dog", "name": "Downward Dog", "category": "Inversion",
                    "duration": "1 min", "description": "Inverted V-shape with hands and feet on floor.",
                    "benefits": "Full body stretch.", "breathingGuidance": "Push through the palms on exhale."
                },
                {
                    "id": "supported-fish", "name": "Supported Fish", "category": "supine",
                    "duration": "3 mins", "description": "Recline over a block placed under the shoulder blades.",
                    "benefits": "Opens the chest.", "breathingGuidance": "Let the breath widen the ribs."
                },
                {
                    "id": "savasana", "name": "Corpse Pose", "category": "Supine",
                    "duration": "5 mins", "description": "Lying flat on the back, total relaxation.",
                    "benefits": "Final integration.", "breathingGuidance": "Let go of all control."
                }
            ]
        })
        .to_string()
    }

    fn canned_script() -> String {
        "Welcome to your practice. Find a comfortable place on your mat and let your breath \
         settle. We will move slowly, one pose at a time, and finish in stillness. Namaste."
            .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let wants_sequence = messages.iter().any(|m| m.content.contains("\"poses\""));
        if !wants_sequence {
            return Ok(Self::canned_script());
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("");
        // 用户消息形如 `Create a sequence based on: "..."`，取引号内的意图作标题
        let intent = last_user
            .split_once('"')
            .and_then(|(_, rest)| rest.rsplit_once('"'))
            .map(|(inner, _)| inner)
            .unwrap_or(last_user);
        Ok(Self::canned_sequence(intent))
    }
}
