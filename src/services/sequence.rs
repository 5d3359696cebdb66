//! 序列生成：调用文本 LLM 得到 JSON 序列，并与体式库合并为画布条目
//!
//! 响应结构由 schemars 生成 JSON Schema 拼入 system prompt，减少格式错误；
//! parse_generated_sequence 从回复中提取 JSON 块（```json ... ``` 或裸 JSON）再解析。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::schema_for;

use crate::catalog::{self, Difficulty, Pose, PoseCategory};
use crate::flow::SequenceItem;
use crate::llm::{LlmClient, Message};
use crate::services::{GeneratedSequence, GenerationError, SequenceGenerator};

/// 未命中体式库时的默认难度与强度
const FALLBACK_DIFFICULTY: Difficulty = Difficulty::Intermediate;
const FALLBACK_INTENSITY: u8 = 5;

fn sequence_schema_json() -> String {
    let schema = schema_for!(GeneratedSequence);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

fn system_prompt() -> String {
    format!(
        "You are a yoga master. Return a professional sequence of 5-10 poses. \
         For each pose, choose a realistic name, duration, and instructions. \
         Be creative but ensure the flow is logical (warmup -> peak -> cooldown).\n\
         Respond with a single JSON object only, no Markdown and no extra text, \
         matching this JSON Schema:\n{}",
        sequence_schema_json()
    )
}

/// 从模型输出中提取并解析序列 JSON
pub fn parse_generated_sequence(output: &str) -> Result<GeneratedSequence, GenerationError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse("sequence generation"));
    }

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end < start {
            return Err(GenerationError::Parse(format!("no JSON object in: {trimmed}")));
        }
        &trimmed[start..=end]
    } else {
        return Err(GenerationError::Parse(format!("no JSON object in: {trimmed}")));
    };

    let parsed: GeneratedSequence = serde_json::from_str(json_str)
        .map_err(|e| GenerationError::Parse(format!("{e}: {json_str}")))?;
    if parsed.poses.is_empty() {
        return Err(GenerationError::Parse("sequence contains no poses".to_string()));
    }
    Ok(parsed)
}

/// 合并后的序列，可直接交给 `Sequence::replace_all`
#[derive(Clone, Debug)]
pub struct MergedSequence {
    pub title: String,
    pub description: String,
    pub items: Vec<SequenceItem>,
}

/// 与体式库合并：名称近似命中时沿用库中的配图、难度与强度，否则保留模型给出的值，
/// 配图留空等待异步补全
pub fn merge_generated(generated: GeneratedSequence) -> MergedSequence {
    let items = generated
        .poses
        .into_iter()
        .map(|gp| {
            let library_match = catalog::find_by_approximate_name(&gp.name);
            let category = gp
                .category
                .parse::<PoseCategory>()
                .ok()
                .or_else(|| library_match.map(|m| m.category))
                .unwrap_or_else(|| {
                    tracing::debug!("Unknown category '{}' for {}, using Standing", gp.category, gp.name);
                    PoseCategory::Standing
                });
            let difficulty = library_match
                .map(|m| m.difficulty)
                .or_else(|| gp.difficulty.as_deref().and_then(|d| d.parse().ok()))
                .unwrap_or(FALLBACK_DIFFICULTY);
            let intensity = library_match
                .map(|m| m.intensity)
                .or(gp.intensity.map(|i| i.min(catalog::MAX_INTENSITY)))
                .unwrap_or(FALLBACK_INTENSITY);
            let id = if gp.id.trim().is_empty() {
                gp.name.to_lowercase().replace(' ', "-")
            } else {
                gp.id
            };
            SequenceItem::from_pose(Pose {
                id,
                name: gp.name,
                category,
                difficulty,
                intensity,
                duration: gp.duration,
                description: gp.description,
                benefits: gp.benefits,
                breathing_guidance: gp.breathing_guidance,
                image_url: library_match.and_then(|m| m.image_url.clone()),
                image_prompt: gp.image_prompt,
            })
        })
        .collect();

    MergedSequence {
        title: generated.title,
        description: generated.description,
        items,
    }
}

/// 基于文本 LLM 的序列生成器（重试由传入的 LlmClient 负责）
pub struct LlmSequenceGenerator {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl LlmSequenceGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt(),
        }
    }
}

#[async_trait]
impl SequenceGenerator for LlmSequenceGenerator {
    async fn generate_sequence(&self, intent: &str) -> Result<GeneratedSequence, GenerationError> {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(format!("Create a sequence based on: \"{}\"", intent.trim())),
        ];
        let output = self.llm.complete(&messages).await?;
        let sequence = parse_generated_sequence(&output)?;
        tracing::info!(
            "Generated sequence '{}' with {} poses",
            sequence.title,
            sequence.poses.len()
        );
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::services::GeneratedPose;

    fn generated(name: &str) -> GeneratedPose {
        GeneratedPose {
            id: name.to_lowercase(),
            name: name.to_string(),
            category: "seated".to_string(),
            difficulty: None,
            intensity: None,
            duration: "1 min".to_string(),
            description: "d".to_string(),
            benefits: "b".to_string(),
            breathing_guidance: "g".to_string(),
            image_prompt: None,
        }
    }

    const BARE: &str = r#"{"title":"T","description":"D","poses":[{"id":"a","name":"Easy Pose","category":"Seated","duration":"1 min","description":"d","benefits":"b","breathingGuidance":"g"}]}"#;

    #[test]
    fn test_parse_bare_json() {
        let seq = parse_generated_sequence(BARE).unwrap();
        assert_eq!(seq.title, "T");
        assert_eq!(seq.poses[0].breathing_guidance, "g");
    }

    #[test]
    fn test_parse_fenced_json_with_chatter() {
        let text = format!("Here is your flow:\n```json\n{BARE}\n```\nEnjoy!");
        let seq = parse_generated_sequence(&text).unwrap();
        assert_eq!(seq.poses.len(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_generated_sequence("I cannot help with that."),
            Err(GenerationError::Parse(_))
        ));
        assert!(matches!(
            parse_generated_sequence(r#"{"title": "T"}"#),
            Err(GenerationError::Parse(_))
        ));
        assert!(matches!(
            parse_generated_sequence(r#"{"title":"T","description":"D","poses":[]}"#),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn test_merge_uses_library_metadata_on_match() {
        let merged = merge_generated(GeneratedSequence {
            title: "T".into(),
            description: "D".into(),
            poses: vec![generated("Headstand"), generated("Floating Lotus Drift")],
        });
        let headstand = &merged.items[0];
        assert_eq!(headstand.pose.difficulty, Difficulty::Advanced);
        assert_eq!(headstand.pose.intensity, 9);
        assert!(headstand.image_url.is_some());
        assert!(!headstand.image_loading);

        let unknown = &merged.items[1];
        assert_eq!(unknown.pose.difficulty, FALLBACK_DIFFICULTY);
        assert_eq!(unknown.pose.intensity, FALLBACK_INTENSITY);
        assert_eq!(unknown.pose.category, PoseCategory::Seated);
        assert!(unknown.image_url.is_none());
        assert!(unknown.image_loading);
        assert_ne!(headstand.canvas_id, unknown.canvas_id);
    }

    #[test]
    fn test_merge_keeps_generated_difficulty_without_match() {
        let mut gp = generated("Floating Lotus Drift");
        gp.difficulty = Some("advanced".into());
        gp.intensity = Some(42);
        let merged = merge_generated(GeneratedSequence {
            title: "T".into(),
            description: "D".into(),
            poses: vec![gp],
        });
        assert_eq!(merged.items[0].pose.difficulty, Difficulty::Advanced);
        assert_eq!(merged.items[0].pose.intensity, catalog::MAX_INTENSITY);
    }

    #[test]
    fn test_schema_mentions_poses() {
        assert!(system_prompt().contains("\"poses\""));
    }

    #[tokio::test]
    async fn test_generate_with_mock_llm() {
        let generator = LlmSequenceGenerator::new(Arc::new(MockLlmClient));
        let seq = generator.generate_sequence("  stiff shoulders ").await.unwrap();
        assert_eq!(seq.title, "Flow for stiff shoulders");
        assert_eq!(seq.poses.len(), 5);
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Err(LlmError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_distinguishable() {
        let generator = LlmSequenceGenerator::new(Arc::new(FailingLlm));
        let err = generator.generate_sequence("x").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err, GenerationError::Llm(LlmError::Timeout));
    }
}
