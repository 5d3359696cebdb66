//! 练习引导音频：先用文本 LLM 写引导词，再交给语音合成；两步作为一次调用整体成败

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};
use crate::services::{
    GenerationError, PoseSummary, PracticeAudioGenerator, PracticeGuidance, SpeechSynthesizer,
};

/// 引导词提示：按顺序列出体式，要求只输出口播文本，以欢迎开场、以 "Namaste" 结束
pub fn script_prompt(title: &str, poses: &[PoseSummary]) -> String {
    let lines: Vec<String> = poses
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. {} ({}). Breathing: {}. Focus: {}",
                i + 1,
                p.name,
                p.duration,
                p.breathing_guidance,
                p.description
            )
        })
        .collect();
    format!(
        "You are a professional yoga instructor. Write a cohesive, soothing guided script \
         for a session titled \"{}\".\n\
         Do not include any metadata, speaker labels, or formatting like asterisks. Just the spoken words.\n\
         Include these poses in order:\n{}\n\n\
         The script should start with a gentle welcome and end with \"Namaste\".",
        title,
        lines.join("\n")
    )
}

pub struct NarratedPracticeAudio {
    llm: Arc<dyn LlmClient>,
    speech: Arc<dyn SpeechSynthesizer>,
}

impl NarratedPracticeAudio {
    pub fn new(llm: Arc<dyn LlmClient>, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { llm, speech }
    }
}

#[async_trait]
impl PracticeAudioGenerator for NarratedPracticeAudio {
    async fn generate_practice_audio(
        &self,
        title: &str,
        poses: &[PoseSummary],
    ) -> Result<PracticeGuidance, GenerationError> {
        let script = self
            .llm
            .complete(&[Message::user(script_prompt(title, poses))])
            .await?;
        let script = script.trim().to_string();
        if script.is_empty() {
            return Err(GenerationError::EmptyResponse("practice script"));
        }
        let audio = self.speech.synthesize(&script).await?;
        tracing::info!(
            "Practice guidance ready: {} chars of script, {} bytes of audio",
            script.len(),
            audio.len()
        );
        Ok(PracticeGuidance { script, audio })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::services::SilentSpeech;

    fn summary(name: &str) -> PoseSummary {
        PoseSummary {
            name: name.to_string(),
            duration: "1 min".to_string(),
            breathing_guidance: "Slow breaths".to_string(),
            description: "Rest".to_string(),
        }
    }

    #[test]
    fn test_script_prompt_lists_poses_in_order() {
        let prompt = script_prompt("Morning", &[summary("Child's Pose"), summary("Cobra Pose")]);
        let first = prompt.find("1. Child's Pose (1 min)").unwrap();
        let second = prompt.find("2. Cobra Pose (1 min)").unwrap();
        assert!(first < second);
        assert!(prompt.contains("session titled \"Morning\""));
        assert!(prompt.contains("Namaste"));
    }

    #[tokio::test]
    async fn test_generates_script_and_audio() {
        let generator =
            NarratedPracticeAudio::new(Arc::new(MockLlmClient), Arc::new(SilentSpeech::new(1_000)));
        let guidance = generator
            .generate_practice_audio("Morning", &[summary("Child's Pose")])
            .await
            .unwrap();
        assert!(guidance.script.contains("Namaste"));
        assert!(!guidance.audio.is_empty());
    }

    struct BrokenSpeech;

    #[async_trait]
    impl SpeechSynthesizer for BrokenSpeech {
        async fn synthesize(&self, _script: &str) -> Result<Vec<u8>, GenerationError> {
            Err(GenerationError::Http {
                status: 500,
                body: "tts down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_synthesis_failure_fails_whole_request() {
        let generator = NarratedPracticeAudio::new(Arc::new(MockLlmClient), Arc::new(BrokenSpeech));
        let err = generator
            .generate_practice_audio("Morning", &[summary("Child's Pose")])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Http { status: 500, .. }));
    }
}
