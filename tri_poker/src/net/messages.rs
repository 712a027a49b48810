use std::fmt;

use crate::game::entities::{Hand, Money, Username};

/// A participant's choice for the current round.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Pay the entry fee and stay in for another round.
    Continue,
    /// Leave the game.
    Fold,
    /// Anything that isn't a menu option. Handled as a fold.
    Unrecognized(String),
}

impl Decision {
    /// Parse a decision token. `1` continues, `2` folds, everything else
    /// is unrecognized.
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "1" => Self::Continue,
            "2" => Self::Fold,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Whether the decision amounts to leaving the game.
    pub fn is_fold(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Fold => write!(f, "fold"),
            Self::Unrecognized(raw) => write!(f, "unrecognized input {raw:?}"),
        }
    }
}

/// Announcements from the host, shown with a `[HOST]:` prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HostNotice {
    Joined(Username),
    Advanced(Username),
    Folded(Username),
    Eliminated(Username),
    Disconnected(Username),
    FoldRefused,
    WaitForOthers,
    ClosingConnection,
    GameAlreadyStarted,
    TableFull,
    Won(Username),
    Made(Username, Money),
    Tied(Username, Username),
    NoWinner,
}

impl fmt::Display for HostNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Joined(username) => format!("{username} has joined the game!"),
            Self::Advanced(username) => format!("{username} is going to the next round!"),
            Self::Folded(username) => format!("{username} folded..."),
            Self::Eliminated(username) => format!("{username} ran out of money and is out"),
            Self::Disconnected(username) => format!("{username} disconnected"),
            Self::FoldRefused => {
                "At least 3 players are needed to fold, continuing instead".to_string()
            }
            Self::WaitForOthers => "Wait for other players".to_string(),
            Self::ClosingConnection => "Closing connection...".to_string(),
            Self::GameAlreadyStarted => "The game has already started".to_string(),
            Self::TableFull => "The game is full".to_string(),
            Self::Won(username) => format!("{username} has won the game!"),
            Self::Made(username, amount) => format!("{username} made ${amount}"),
            Self::Tied(a, b) => format!("{a} & {b} tied"),
            Self::NoWinner => "Everyone left, nobody wins".to_string(),
        };
        write!(f, "[HOST]: {repr}")
    }
}

/// A message from the host to a participant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServerMessage {
    /// A `[HOST]:` announcement.
    Notice(HostNotice),
    /// Plain game flow text such as the intro lines.
    Status(String),
    /// The participant's own hand.
    Hand(Hand),
    /// Per-round table stats from the participant's point of view.
    Stats {
        pot: Money,
        participants: usize,
        balance: Money,
    },
    /// The fixed two-option round menu.
    Menu,
}

impl ServerMessage {
    /// Whether the line should be followed by a `> ` input prompt.
    pub fn prompts(&self) -> bool {
        matches!(self, Self::Notice(_) | Self::Status(_))
    }
}

impl From<HostNotice> for ServerMessage {
    fn from(value: HostNotice) -> Self {
        Self::Notice(value)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Notice(notice) => write!(f, "{notice}"),
            Self::Status(status) => write!(f, "{status}"),
            Self::Hand(hand) => write!(f, "Your hand:\n{hand}"),
            Self::Stats {
                pot,
                participants,
                balance,
            } => write!(
                f,
                "Game stats: Pot: {pot}\n# of players: {participants}\nYour balance: {balance}"
            ),
            Self::Menu => write!(
                f,
                "> [1] Continue to next round\n\
                 > [2] Fold and leave the game\n\
                 > Note: A number outside the range will result in folding from the round\n\
                 > Choice:"
            ),
        }
    }
}
