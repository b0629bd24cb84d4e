//! Instruction text sent with each request.

use aura_core::Mode;

const GOLDEN_RATIO_PROMPT: &str = "\
ACT AS: An expert plastic surgeon and geometrician.
TASK: Restructure the face in this photo so its proportions follow the Golden Ratio (Phi = 1.618).

Use the Marquardt Beauty Mask as the structural template:
1. VERTICAL THIRDS: hairline to brow, brow to nose base and nose base to chin must be equal.
2. FACE SHAPE: face length to face width should approach 1.618.
3. EYES: the space between the eyes equals the width of one eye.
4. NOSE: nose width matches the inter-eye distance; refine the bridge and tip.
5. MOUTH: mouth width is 1.618 times the nose width; balance the upper and lower lip.
6. JAW & CHIN: define the mandible and align the chin with the facial midline.

OUTPUT REQUIREMENTS:
- PHOTOREALISTIC. Keep skin texture, lighting, hair, background and expression.
- CHANGE THE BONE STRUCTURE to match Phi; do not merely retouch the skin.
- It must remain recognizably the same person.";

const SYMMETRY_PROMPT: &str = "\
ACT AS: An expert maxillofacial surgeon specializing in facial symmetry.
TASK: Make the face in this photo perfectly bilaterally symmetrical about the vertical midline.

Work feature by feature:
1. NOSE: straighten any deviation so the bridge and tip sit on the midline.
2. EYES: level both eyes and match their size, shape and lid height.
3. BROWS: match brow height, arch and thickness.
4. JAW & CHIN: even out the jawline on both sides and center the chin.
5. MOUTH: level the corners of the mouth and balance the lips.

OUTPUT REQUIREMENTS:
- Keep it realistic. Preserve skin texture, lighting, hair, background and expression.
- The result must show the features of the same person, corrected for symmetry.";

/// Instruction sent alongside the photo for image synthesis.
pub fn synthesis_prompt(mode: Mode) -> &'static str {
    match mode {
        Mode::GoldenRatio => GOLDEN_RATIO_PROMPT,
        Mode::Symmetry => SYMMETRY_PROMPT,
    }
}

/// Instruction sent alongside both photos for the structured critique.
pub fn analysis_instruction(mode: Mode) -> String {
    format!(
        "The first image is the user's original face. \
The second image is the AI-generated '{label}' version of their face.
1. Analyze the facial landmarks and measure how far the original is from the target.
2. Determine which facial yoga, mewing or massage exercises would move the original toward the target.
3. Be realistic about what is achievable naturally (muscular hypertrophy and toning) versus what depends on bone structure.
4. Provide a JSON response that follows the supplied schema.",
        label = mode.analysis_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_differ_by_mode() {
        assert_ne!(
            synthesis_prompt(Mode::GoldenRatio),
            synthesis_prompt(Mode::Symmetry)
        );
        assert!(synthesis_prompt(Mode::GoldenRatio).contains("1.618"));
        assert!(synthesis_prompt(Mode::Symmetry).contains("symmetr"));
    }

    #[test]
    fn test_analysis_instruction_names_target() {
        assert!(analysis_instruction(Mode::GoldenRatio).contains("'Golden Ratio'"));
        assert!(analysis_instruction(Mode::Symmetry).contains("'Perfect Symmetry'"));
        assert!(analysis_instruction(Mode::Symmetry).contains("JSON"));
    }
}
