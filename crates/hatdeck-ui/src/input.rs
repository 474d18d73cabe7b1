use std::fmt;

/// One of the six capacitive pads on the HAT, in channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Back,
    DimDown,
    Ok,
    DimUp,
}

impl Button {
    pub const ALL: [Self; 6] = [
        Self::Up,
        Self::Down,
        Self::Back,
        Self::DimDown,
        Self::Ok,
        Self::DimUp,
    ];

    /// `0=Up, 1=Down, 2=Back, 3=Dim-, 4=OK, 5=Dim+`
    pub fn from_channel(channel: u8) -> Option<Self> {
        Self::ALL.get(channel as usize).copied()
    }

    pub fn channel(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Back => 2,
            Self::DimDown => 3,
            Self::Ok => 4,
            Self::DimUp => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Back => "BACK",
            Self::DimDown => "-",
            Self::Ok => "OK",
            Self::DimUp => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Press,
    Release,
}

/// A raw event as delivered by an input backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub channel: u8,
    pub kind: EventKind,
}

impl InputEvent {
    pub fn press(button: Button) -> Self {
        Self {
            channel: button.channel(),
            kind: EventKind::Press,
        }
    }

    pub fn release(button: Button) -> Self {
        Self {
            channel: button.channel(),
            kind: EventKind::Release,
        }
    }

    /// The pressed button, or `None` for releases and unknown channels.
    pub fn pressed(&self) -> Option<Button> {
        match self.kind {
            EventKind::Press => Button::from_channel(self.channel),
            EventKind::Release => None,
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Button::from_channel(self.channel)
            .map(Button::label)
            .unwrap_or("?");
        write!(f, "ch{}({name}) {:?}", self.channel, self.kind)
    }
}

/// Translate a hardware pad index into a logical channel using the configured wiring map.
pub fn remap_channel(map: &[u8], hardware_index: u8) -> Option<u8> {
    map.get(hardware_index as usize).copied()
}

/// Parse one line typed on the simulator console.
pub fn parse_console_key(line: &str) -> Option<Button> {
    match line.trim() {
        "0" | "u" | "w" | "up" => Some(Button::Up),
        "1" | "d" | "s" | "down" => Some(Button::Down),
        "2" | "b" | "back" => Some(Button::Back),
        "3" | "-" => Some(Button::DimDown),
        "4" | "o" | "ok" | "" => Some(Button::Ok),
        "5" | "+" | "=" => Some(Button::DimUp),
        _ => None,
    }
}
