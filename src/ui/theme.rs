use ratatui::style::Color;

// Primary colors
pub const ACCENT: Color = Color::Rgb(0, 175, 255); // #00afff - cyan-blue
pub const ACCENT_DIM: Color = Color::Rgb(0, 135, 200);
pub const SUCCESS: Color = Color::Rgb(134, 188, 111); // soft green
pub const WARNING: Color = Color::Rgb(229, 192, 123); // warm amber

// Text colors
pub const TEXT: Color = Color::Rgb(240, 240, 240);
pub const TEXT_MUTED: Color = Color::Rgb(144, 144, 144);

// Background colors
pub const BG_BASE: Color = Color::Rgb(24, 24, 28);
pub const BG_SELECTED: Color = Color::Rgb(38, 58, 82); // selection bar

// Border colors
pub const BORDER: Color = Color::Rgb(66, 66, 70);

// Role colors in the tree
pub const ROOT_NODE: Color = Color::Rgb(134, 188, 111); // roots green
pub const CHILD_NODE: Color = Color::Rgb(0, 175, 255); // follow-ups cyan
