//! Prompt contracts sent to each provider.
//!
//! A contract names the role the model plays, the task, an ordered list of
//! analysis steps and the JSON shape the reply must take. The shape is shared
//! so every provider answers in the same grammar.

use std::fmt::Write;

/// One enumerated analysis step.
#[derive(Debug)]
pub struct AnalysisStep {
    pub name: &'static str,
    pub focus: &'static [&'static str],
}

/// Provider-specific request framing.
#[derive(Debug)]
pub struct PromptContract {
    pub role: &'static str,
    pub task: &'static str,
    pub steps: &'static [AnalysisStep],
}

const ROLE: &str = "Expert photographer and Adobe Lightroom specialist";
const TASK: &str = "Analyze images and generate professional Lightroom presets";

pub static GEMINI: PromptContract = PromptContract {
    role: ROLE,
    task: TASK,
    steps: &[
        AnalysisStep {
            name: "Basic Analysis",
            focus: &["Overall exposure", "Contrast", "Highlights", "Shadows"],
        },
        AnalysisStep {
            name: "Color Analysis",
            focus: &["Color temperature", "Tint", "Color balance"],
        },
    ],
};

pub static OPENAI: PromptContract = PromptContract {
    role: ROLE,
    task: TASK,
    steps: &[
        AnalysisStep {
            name: "Scene Analysis",
            focus: &["Lighting conditions", "Subject type", "Color palette"],
        },
        AnalysisStep {
            name: "Technical Analysis",
            focus: &["Exposure settings", "Color balance", "Detail levels"],
        },
    ],
};

pub static ANTHROPIC: PromptContract = PromptContract {
    role: ROLE,
    task: TASK,
    steps: &[
        AnalysisStep {
            name: "Compositional Analysis",
            focus: &["Image composition", "Subject emphasis", "Mood"],
        },
        AnalysisStep {
            name: "Style Analysis",
            focus: &["Photographic style", "Color treatment", "Processing approach"],
        },
    ],
};

/// Required reply grammar, with documented ranges.
const RESPONSE_SHAPE: &str = r#"{
  "basic": {
    "exposure": float (-5.0 to 5.0),
    "contrast": int (-100 to 100),
    "highlights": int (-100 to 100),
    "shadows": int (-100 to 100),
    "whites": int (-100 to 100),
    "blacks": int (-100 to 100),
    "clarity": int (-100 to 100),
    "dehaze": int (-100 to 100),
    "vibrance": int (-100 to 100),
    "saturation": int (-100 to 100)
  },
  "color": {
    "temperature": int (2000 to 50000 Kelvin),
    "tint": int (-150 to 150)
  },
  "hsl": {
    "red": {"hue": int (-100 to 100), "saturation": int (-100 to 100), "luminance": int (-100 to 100)},
    "orange": {...}, "yellow": {...}, "green": {...},
    "aqua": {...}, "blue": {...}, "purple": {...}, "magenta": {...}
  },
  "detail": {
    "sharpness": int (0 to 150),
    "radius": float (0.5 to 3.0),
    "detail": int (0 to 100),
    "masking": int (0 to 100),
    "noiseReduction": int (0 to 100),
    "colorNoiseReduction": int (0 to 100)
  },
  "effects": {
    "amount": int (0 to 100),
    "midpoint": int (0 to 100),
    "roundness": int (-100 to 100),
    "feather": int (0 to 100)
  }
}"#;

impl PromptContract {
    /// Render the full prompt text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(2048);
        let _ = writeln!(out, "You are an {}.", self.role.to_lowercase());
        let _ = writeln!(
            out,
            "Task: {}. Analyze this image and recommend the adjustments that would \
             recreate its look on a similar photograph.",
            self.task
        );
        out.push_str("\nWork through these steps:\n");
        for (i, step) in self.steps.iter().enumerate() {
            let _ = writeln!(out, "{}. {}: {}", i + 1, step.name, step.focus.join(", "));
        }
        out.push_str("\nFormat your response as a JSON object with the following structure:\n");
        out.push_str(RESPONSE_SHAPE);
        out.push_str(
            "\n\nTemperature is an absolute white balance in Kelvin. \
             Omit any field you have no recommendation for.\n\
             Only return the JSON object, no other text.\n",
        );
        out
    }
}

/// Contract used for a provider name. Unknown names get the Gemini framing.
pub fn contract_for(provider: &str) -> &'static PromptContract {
    match provider {
        "openai" => &OPENAI,
        "anthropic" => &ANTHROPIC,
        _ => &GEMINI,
    }
}
