/// Wall-clock bound on one renderer invocation.
pub const RENDER_TIMEOUT_SECS: u64 = 120;
pub const RENDER_QUALITY: &str = "m";
pub const RENDER_FPS: u32 = 30;
pub const RENDER_FORMAT: &str = "mp4";

/// Name of the script file written into each render workspace.
pub const SCRIPT_FILE_NAME: &str = "animation_code.py";

pub const NO_EXPLANATION: &str = "No explanation provided.";
pub const GENERATION_FAILED_EXPLANATION: &str =
    "Failed to generate code for this prompt. Please try a different request.";

pub const FALLBACK_FEEDBACK: &str =
    "Thank you for your response. Let's continue with the next question.";
pub const FINAL_MESSAGE: &str = "Thank you for completing the interview! You did well discussing the problem and your approach. I'll now generate a detailed report of your performance.";

/// Upper bound on characters of tool diagnostics carried into a user-facing note.
pub const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// Problem descriptions are clipped before they go into a question prompt.
pub const MAX_PROBLEM_CONTENT_CHARS: usize = 1000;
