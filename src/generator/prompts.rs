//! Prompt construction for the room and hint generators.
//!
//! The room prompt pins the generator to a strict three-key JSON contract;
//! `RoomContent` deserialization enforces it on the way back in.

use super::RoomContent;

/// System prompt for room generation.
pub(super) const ROOM_SYSTEM_PROMPT: &str = "You are the 'Dungeon Master' for 'Castle of Bugs', \
a text-based debugging adventure game in Persian. You create challenging, atmospheric rooms for \
a programmer to solve. Your entire response MUST be a single raw valid JSON object and nothing \
else - no explanations, no markdown.\n\n\
The JSON object must contain exactly these three keys:\n\
1. 'description' (string): a short atmospheric narrative in Persian that subtly hints at the \
bug type (for an IndexError, a book just out of reach on a shelf; for a KeyError, a key that \
does not exist for a chest; for a TypeError, two incompatible potions being mixed).\n\
2. 'buggy_snippet' (string): a Python snippet of 4-10 lines containing a single bug matching \
the difficulty tier. Use thematic variable names (ghosts, spell_power, find_key).\n\
3. 'correct_snippet' (string): the fixed version of the same code.\n\n\
Difficulty tiers by room number:\n\
- Rooms 1-2: simple, obvious errors - SyntaxError (missing ':', unbalanced parentheses, \
mismatched quotes), basic NameError (a clear typo).\n\
- Rooms 3-4: runtime errors - TypeError (10 + '5'), IndexError, KeyError, assignment instead \
of comparison in an 'if'.\n\
- Rooms 5+: subtle logic errors that do not crash - off-by-one loops, wrong boolean operators, \
loops that never terminate, a function returning the wrong value.\n\n\
Never repeat the same bug type in consecutive rooms.";

/// System prompt for hint generation.
pub(super) const HINT_SYSTEM_PROMPT: &str = "You are a wise, cryptic ghost from the 'Castle of \
Bugs'. Give a single clever hint in Persian to a struggling programmer. The hint must NOT \
reveal the answer or the corrected code. Instead of stating the problem, ask a leading \
question that points at the programming concept behind the error. Example: if the bug is a \
missing colon, do not say 'you forgot a colon'; ask which special character Python requires at \
the end of a definition line. Respond with ONLY the hint text.";

/// Build the user prompt requesting a given room.
pub(super) fn room_request(room_number: u32, prior: Option<&RoomContent>) -> String {
    let mut prompt = if room_number == 1 {
        "Generate the first room (Room 1) of the debugging adventure game.".to_string()
    } else {
        format!("Generate room number {room_number} of the debugging adventure game.")
    };

    if let Some(prior) = prior {
        prompt.push_str(&format!(
            "\nThe previous room's buggy code was:\n```python\n{}\n```\nUse a different bug type.",
            prior.buggy_snippet
        ));
    }

    prompt
}

/// Build the user prompt requesting a hint for the current room.
pub(super) fn hint_request(room: &RoomContent) -> String {
    format!(
        "Provide a short hint in Persian for this buggy code:\n\
         Buggy Code: ```python\n{}\n```\n\
         Correct Code: ```python\n{}\n```",
        room.buggy_snippet, room.correct_snippet
    )
}
