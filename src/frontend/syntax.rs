//! Names of the grammar rules and the closed set of keywords.
//!
//! Any identifier spelled like a keyword is lexed as a keyword, so a
//! keyword can never name a variable, a constant or a script.

pub const STATEMENT: &str = "STATEMENT";
pub const EXPRESSION: &str = "EXPRESSION";
pub const CONDITION: &str = "CONDITION";
pub const OBJECT: &str = "OBJECT";
pub const CONST_EXPR: &str = "CONST_EXPR";
pub const COORD_EXPR: &str = "COORD_EXPR";

/// Every word the grammar spells out, sorted for binary search.
pub const KEYWORDS: [&str; 391] = [
    "3d", "across", "action", "actions", "active", "add", "adult", "affect", "affected", "after",
    "alignment", "all", "ally", "amplitude", "and", "angle", "anim", "anti", "appear", "arena",
    "around", "arse", "as", "at", "attach", "attack", "attacked", "attitude", "auto", "available",
    "avi", "background", "balance", "begin", "behind", "belief", "belly", "bits", "blue",
    "bookmark", "boost", "build", "building", "buttons", "by", "calm", "camera", "can", "capacity",
    "carrying", "cast", "category", "challenge", "charging", "cinema", "clear", "clicked",
    "climate", "cling", "clipping", "close", "clouds", "colour", "computer", "constant", "create",
    "create_creature_from_creature", "creature", "creed", "curl", "current", "dance", "dawn", "day",
    "dead", "deaths", "define", "degrees", "delete", "demo", "desire", "desires", "destination",
    "destroys", "detach", "detail", "details", "developer", "development", "dialogue", "disable",
    "disappear", "disband", "disciple", "distance", "down", "draw", "dropped", "dual", "duration",
    "dusk", "effect", "effects", "eject", "else", "elsif", "enable", "end", "enter", "entrance",
    "event", "events", "everything", "evil", "excluding", "exists", "exit", "explode", "explosion",
    "extra", "face", "facing", "fade", "fallspeed", "fight", "fighting", "files", "finish", "fire",
    "first", "fixed", "float", "flock", "fly", "flying", "focus", "follow", "football", "for",
    "force", "forkmax", "forkmin", "forward", "friends", "from", "function", "game", "games", "get",
    "gfx", "global", "good", "graphics", "green", "hand", "has", "heading", "health", "height",
    "held", "help", "high", "highlight", "hit", "hits", "home", "hurt", "icon", "id", "if",
    "immersion", "in", "inclusion", "indestructible", "influence", "info", "initialise", "inner",
    "inside", "interacting", "interaction", "intro", "is", "jc", "jump", "keeping", "key", "known",
    "label", "land", "last", "leader", "leash", "leashed", "lens", "line", "load", "local",
    "locked", "look", "looking", "loop", "magic", "magnitude", "make", "male", "mana", "map",
    "marker", "maximum", "mist", "modify", "month", "moon", "mouse", "move", "moveable",
    "multiplayer", "music", "my_creature", "name", "near", "nearest", "next", "night", "not",
    "number", "object", "of", "old", "on", "only", "open", "opposite", "or", "out", "outer", "over",
    "overcast", "own", "path", "pause", "per", "percentage", "personality", "pickup", "pitch",
    "placed", "play", "played", "player", "player_creature", "playing", "point", "pointing",
    "poisoned", "populate", "position", "power", "priority", "profile", "properties", "property",
    "quest", "queue", "radius", "rainfall", "random", "ratio", "raw", "reaction", "read", "ready",
    "real", "red", "referee", "relative", "release", "remaining", "remove", "reset", "resistance",
    "resource", "restart", "restore", "reverse", "reversion", "reward", "root", "rotation", "run",
    "sacrifice", "save", "say", "scale", "script", "scripted", "scripts", "second", "seconds",
    "send", "sequence", "set", "shade", "shake", "sheetmax", "sheetmin", "since", "single", "site",
    "size", "skeleton", "skip", "sky", "slot", "slowest", "snapshot", "snowfall", "sound", "source",
    "speaks", "special", "specific", "speed", "spell", "spirit", "square", "start", "state",
    "statue", "step", "stop", "store", "stored", "storms", "sub", "success", "suppression", "swap",
    "system", "tag", "target", "teach", "team", "temperature", "temple", "text", "time", "timer",
    "times", "to", "toggle", "total", "totem", "town", "training", "transparency", "tribe",
    "trigger", "tutorial", "type", "ulong", "unpause", "until", "update", "valid", "variable",
    "velocity", "view", "viewed", "villager", "virtual", "wait", "walk", "weather", "weekday",
    "wheel", "when", "which", "while", "widescreen", "width", "wind", "window", "with", "within",
    "without", "world", "worship", "year", "zones",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_sorted_and_unique() {
        assert!(KEYWORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_is_keyword() {
        for kw in ["begin", "script", "end", "elsif", "camera", "seconds", "3d"] {
            assert!(is_keyword(kw), "{}", kw);
        }
        for name in ["x", "obj", "Begin", "foo", "CHALLENGE_T1"] {
            assert!(!is_keyword(name), "{}", name);
        }
    }
}
