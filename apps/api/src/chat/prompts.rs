// Fixed assistant texts shown by the chat controller.

/// Seeded as the first assistant turn of every session.
pub const GREETING: &str = "Hey there! I'm your personal career coach. What position are you looking for? \
    Please upload your resume and type the role you're interested in into the chat input, then hit enter to start!";

/// Reply given to any message sent before a resume has been processed.
pub const UPLOAD_FIRST_REPLY: &str =
    "Please upload your resume first to get personalised recommendations.";

/// Prefix of the transient notice shown when a resume upload fails.
pub const UPLOAD_ERROR_PREFIX: &str = "Error processing resume";

/// Prefix of the transient notice shown when a chat turn fails.
pub const TURN_ERROR_PREFIX: &str = "Error processing request";

/// Assistant turn recorded once a resume has been processed.
pub const UPLOAD_CONFIRMATION: &str = "Resume uploaded. Tell me what kind of role you're looking for \
    and I'll match you with relevant job postings.";
