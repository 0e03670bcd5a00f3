/// Instruction sent with every sample. The JSON shape below is what
/// [`crate::parser::parse_estimate`] expects back; keep the two in sync.
pub const NUTRITION_INSTRUCTION: &str = r#"Analyze this food image and estimate total calories, macronutrients (g), fiber (g), sugar (g), and satiety index (decimal, e.g. 3.23 = 323% and 0.47 = 47%). Return only valid JSON with no markdown:
{
  "calories_cal": number,
  "macronutrients": {
    "fat_g": number,
    "protein_g": number,
    "carbs_g": number
  },
  "fiber_g": number,
  "sugar_g": number,
  "satiety_index": number
}"#;
