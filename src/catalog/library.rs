//! 内置体式库（静态数据）

use std::sync::LazyLock;

use super::pose::{Difficulty, Pose, PoseCategory};

/// 占位配图：与在线演示站一致的 loremflickr 地址，按种子区分
pub fn placeholder_image(seed: &str) -> String {
    format!("https://loremflickr.com/600/400/yoga,asana,{seed}?random={seed}")
}

#[allow(clippy::too_many_arguments)]
fn pose(
    id: &str,
    name: &str,
    category: PoseCategory,
    difficulty: Difficulty,
    intensity: u8,
    duration: &str,
    description: &str,
    benefits: &str,
    breathing_guidance: &str,
    image_seed: &str,
) -> Pose {
    Pose {
        id: id.to_string(),
        name: name.to_string(),
        category,
        difficulty,
        intensity,
        duration: duration.to_string(),
        description: description.to_string(),
        benefits: benefits.to_string(),
        breathing_guidance: breathing_guidance.to_string(),
        image_url: Some(placeholder_image(image_seed)),
        image_prompt: None,
    }
}

pub(super) static POSE_LIBRARY: LazyLock<Vec<Pose>> = LazyLock::new(|| {
    use Difficulty::*;
    use PoseCategory::*;
    vec![
        // Standing
        pose("tadasana", "Mountain Pose (Tadasana)", Standing, Beginner, 1, "1 min",
            "Standing tall with feet together.", "Improves posture and balance.",
            "Deep, steady inhales.", "mountain"),
        pose("vrikshasana", "Tree Pose (Vrikshasana)", Balance, Beginner, 3, "30s each side",
            "Balance on one leg, other foot on inner thigh.", "Strengthens legs and focus.",
            "Focus on a single point.", "tree"),
        pose("virabhadrasana1", "Warrior I", Standing, Intermediate, 5, "45s",
            "Deep lunge with arms raised high.", "Builds stamina and core strength.",
            "Inhale as you reach up.", "warrior1"),
        pose("virabhadrasana2", "Warrior II", Standing, Intermediate, 5, "45s",
            "Lunge with arms spread wide.", "Opens hips and chest.",
            "Exhale as you sink deeper.", "warrior2"),
        pose("trikonasana", "Triangle Pose", Standing, Intermediate, 4, "1 min",
            "Extended legs with one hand reaching for the floor.", "Stretches spine and legs.",
            "Breathe into the side body.", "triangle"),
        // Kneeling
        pose("marjaryasana", "Cat-Cow Stretch", Kneeling, Beginner, 2, "2 mins",
            "Flowing between arched and rounded spine.", "Warms up the spine.",
            "Inhale to arch, exhale to round.", "catcow"),
        pose("balasana", "Child's Pose", Kneeling, Beginner, 1, "2 mins",
            "Resting with forehead on mat.", "Calms the nervous system.",
            "Slow, deep belly breaths.", "child"),
        pose("adho_mukha", "Downward Dog", Inversion, Beginner, 4, "1 min",
            "Inverted V-shape with hands and feet on floor.", "Full body stretch.",
            "Push through the palms on exhale.", "downdog"),
        // Seated
        pose("paschimottanasana", "Seated Forward Fold", Seated, Beginner, 3, "2 mins",
            "Folding forward over extended legs.", "Stretches the hamstrings.",
            "Exhale as you fold.", "forwardfold"),
        pose("baddha_konasana", "Butterfly Pose", Seated, Beginner, 2, "2 mins",
            "Feet together, knees dropped to sides.", "Opens inner thighs.",
            "Gently flap the \"wings\" with breath.", "butterfly"),
        pose("sukhasana", "Easy Pose", Seated, Beginner, 1, "5 mins",
            "Cross-legged sitting for meditation.", "Promotes stillness.",
            "Natural, unforced breath.", "easy"),
        // Peak
        pose("bakasana", "Crow Pose (Bakasana)", Balance, Advanced, 8, "30s",
            "Knees rest on the backs of the upper arms as the feet lift off the mat.",
            "Builds arm strength and core control.", "Short, steady breaths through the nose.",
            "crow"),
        pose("sirsasana", "Headstand (Sirsasana)", Inversion, Advanced, 9, "1 min",
            "Forearms and crown of the head ground while the legs rise overhead.",
            "Strengthens shoulders and calms the mind.", "Slow, even breath; never hold it.",
            "headstand"),
        pose("urdhva_dhanurasana", "Wheel Pose (Urdhva Dhanurasana)", Supine, Advanced, 9, "30s",
            "Press up from the back into a full backbend.", "Opens the chest and front body.",
            "Inhale to lift, keep breathing in the hold.", "wheel"),
        // Supine/Prone
        pose("bhujangasana", "Cobra Pose", Prone, Beginner, 3, "30s",
            "Lifting chest off the floor.", "Strengthens the back.",
            "Inhale as you lift.", "cobra"),
        pose("setu_bandha", "Bridge Pose", Supine, Intermediate, 5, "1 min",
            "Lifting hips with feet flat.", "Energizes the body.",
            "Exhale to lower down.", "bridge"),
        pose("shavasana", "Corpse Pose (Shavasana)", Supine, Beginner, 0, "5 mins",
            "Lying flat on the back, total relaxation.", "Final integration.",
            "Let go of all control.", "shavasana"),
    ]
});

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::catalog::MAX_INTENSITY;

    #[test]
    fn test_library_ids_are_unique() {
        let ids: HashSet<&str> = POSE_LIBRARY.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), POSE_LIBRARY.len());
    }

    #[test]
    fn test_library_entries_are_well_formed() {
        for p in POSE_LIBRARY.iter() {
            assert!(p.intensity <= MAX_INTENSITY, "{} intensity out of range", p.id);
            assert!(p.image_url.is_some(), "{} has no static image", p.id);
            assert!(!p.breathing_guidance.is_empty());
        }
    }
}
