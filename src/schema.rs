//! Compile-time class/property tables and the runtime registry built from
//! them. The table contents below describe a small fictional replicated
//! object model (game state, players, weapons, a capture-the-flag object,
//! and the implicit root object) built to exercise every `ValueKind`.

use std::collections::HashMap;

use crate::value::{Member, PropertyDescriptor, ValueKind};

#[derive(Clone, Copy)]
pub struct StaticClass {
    /// 32-character `'0'`/`'1'` string; character `i` is bit `i` as taken
    /// off the wire, matching `key_str_to_u32`. Unused for the root class,
    /// which is never looked up by key.
    pub key: &'static str,
    pub name: &'static str,
    pub properties: &'static [(&'static str, PropertyDescriptor)],
}

#[derive(Debug, Clone)]
pub struct RuntimeClass {
    pub name: String,
    pub properties: HashMap<String, PropertyDescriptor>,
    pub id_size: usize,
}

impl RuntimeClass {
    fn from_static(class: &StaticClass) -> Self {
        let properties: HashMap<String, PropertyDescriptor> = class
            .properties
            .iter()
            .map(|(key, descriptor)| (key.to_string(), *descriptor))
            .collect();
        let id_size = class
            .properties
            .first()
            .map(|(key, _)| key.len())
            .unwrap_or(6);
        Self {
            name: class.name.to_string(),
            properties,
            id_size,
        }
    }

    fn empty(name: String) -> Self {
        Self {
            name,
            properties: HashMap::new(),
            id_size: 6,
        }
    }
}

/// Distinguishes the implicit, permanently-bound channel-0 root object
/// from every other class, which is addressed by its 32-bit wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKey {
    Root,
    Id(u32),
}

/// Applies the high-5-bits-`10001` normalization rule to a freshly-read
/// 32-bit class key, operating on the bit sequence directly (character
/// order == bit order, matching how the static tables below are authored)
/// so there's no ambiguity about which end is "high".
pub fn normalize_class_bits(raw: &[bool]) -> u32 {
    debug_assert_eq!(raw.len(), 32);
    let mut bits = raw.to_vec();
    if bits[0..5] == [true, false, false, false, true] {
        for b in bits[5..].iter_mut() {
            *b = false;
        }
    }
    crate::bits::bits_to_u32(&bits)
}

pub struct Registry {
    root: RuntimeClass,
    classes: HashMap<u32, RuntimeClass>,
}

impl Registry {
    pub fn new() -> Self {
        let mut classes = HashMap::new();
        for class in STATIC_CLASSES {
            let key = crate::bits::key_str_to_u32(class.key);
            classes.insert(key, RuntimeClass::from_static(class));
        }
        Self {
            root: RuntimeClass::from_static(&ROOT_CLASS),
            classes,
        }
    }

    pub fn root_class(&self) -> &RuntimeClass {
        &self.root
    }

    /// Looks up a class, registering a synthetic `unknown<N>` entry with an
    /// empty property table on miss so the channel stays live instead of
    /// failing outright.
    pub fn lookup_or_insert(&mut self, key: u32) -> &RuntimeClass {
        if !self.classes.contains_key(&key) {
            let name = format!("unknown{}", self.classes.len());
            tracing::warn!(class_key = key, name = %name, "registering unrecognized class");
            self.classes.insert(key, RuntimeClass::empty(name));
        }
        self.classes.get(&key).expect("just inserted")
    }

    pub fn class(&self, key: ClassKey) -> &RuntimeClass {
        match key {
            ClassKey::Root => &self.root,
            ClassKey::Id(id) => self
                .classes
                .get(&id)
                .expect("class_key resolved via lookup_or_insert"),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

const ROOT_CLASS: StaticClass = StaticClass {
    key: "",
    name: "RootObject",
    properties: &[
        (
            "10000000",
            PropertyDescriptor {
                name: "welcome_blob",
                kind: ValueKind::Mystery3,
            },
        ),
        (
            "11000000",
            PropertyDescriptor {
                name: "session_info",
                kind: ValueKind::Struct(&[
                    Member {
                        name: "session_id",
                        kind: ValueKind::Int32,
                    },
                    Member {
                        name: "realm",
                        kind: ValueKind::Str,
                    },
                ]),
            },
        ),
        (
            "00100000",
            PropertyDescriptor {
                name: "server_handshake",
                kind: ValueKind::Struct(&[
                    Member {
                        name: "flags",
                        kind: ValueKind::SizedBits(88),
                    },
                    Member {
                        name: "server_url",
                        kind: ValueKind::Str,
                    },
                ]),
            },
        ),
        (
            "11100000",
            PropertyDescriptor {
                name: "motd",
                kind: ValueKind::Mystery1,
            },
        ),
        (
            "11010000",
            PropertyDescriptor {
                name: "endpoint_list",
                kind: ValueKind::Mystery2,
            },
        ),
    ],
};

static GAME_STATE_FLAG: &[(&str, &str)] = &[
    ("0000000000", "EnemyFlagOnStand"),
    ("1000000000", "OwnFlagOnStand"),
    ("0100000000", "EnemyFlagTaken"),
    ("1100000000", "OwnFlagTaken"),
];

static TEAM: &[(&str, &str)] = &[
    ("00000000000", "Unassigned"),
    ("10000000000", "Red"),
    ("01000000000", "Blue"),
];

static GAME_STATE: StaticClass = StaticClass {
    key: "01011000000000000000000000000001",
    name: "GameState",
    properties: &[
        (
            "000000",
            PropertyDescriptor {
                name: "net_flags",
                kind: ValueKind::SizedBits(5),
            },
        ),
        (
            "011010",
            PropertyDescriptor {
                name: "server_name",
                kind: ValueKind::Str,
            },
        ),
        (
            "111010",
            PropertyDescriptor {
                name: "time_limit",
                kind: ValueKind::Int32,
            },
        ),
        (
            "101110",
            PropertyDescriptor {
                name: "match_over",
                kind: ValueKind::Bool,
            },
        ),
        (
            "001001",
            PropertyDescriptor {
                name: "flag_state",
                kind: ValueKind::MultipleChoice(10, GAME_STATE_FLAG),
            },
        ),
    ],
};

static PLAYER_INFO: StaticClass = StaticClass {
    key: "01011000000000000000000000000010",
    name: "PlayerInfo",
    properties: &[
        (
            "000000",
            PropertyDescriptor {
                name: "net_flags",
                kind: ValueKind::SizedBits(5),
            },
        ),
        (
            "000001",
            PropertyDescriptor {
                name: "player_id",
                kind: ValueKind::Int32,
            },
        ),
        (
            "100001",
            PropertyDescriptor {
                name: "player_name",
                kind: ValueKind::Str,
            },
        ),
        (
            "110001",
            PropertyDescriptor {
                name: "deaths",
                kind: ValueKind::Int32,
            },
        ),
        (
            "010101",
            PropertyDescriptor {
                name: "has_flag",
                kind: ValueKind::Bool,
            },
        ),
        (
            "011001",
            PropertyDescriptor {
                name: "team",
                kind: ValueKind::MultipleChoice(11, TEAM),
            },
        ),
    ],
};

static CONTROLLER: StaticClass = StaticClass {
    key: "01011000000000000000000000000011",
    name: "Controller",
    properties: &[
        (
            "01000000",
            PropertyDescriptor {
                name: "collide_world",
                kind: ValueKind::SizedBits(2),
            },
        ),
        (
            "11000000",
            PropertyDescriptor {
                name: "rpc_match_over",
                kind: ValueKind::Params(&[
                    Member {
                        name: "winner_id",
                        kind: ValueKind::Int32,
                    },
                    Member {
                        name: "winner_name",
                        kind: ValueKind::Str,
                    },
                ]),
            },
        ),
        (
            "01100000",
            PropertyDescriptor {
                name: "rpc_countdown",
                kind: ValueKind::Params(&[Member {
                    name: "seconds",
                    kind: ValueKind::Int32,
                }]),
            },
        ),
        (
            "00100100",
            PropertyDescriptor {
                name: "rpc_goto_state",
                kind: ValueKind::Struct(&[
                    Member {
                        name: "new_state",
                        kind: ValueKind::SizedBits(11),
                    },
                    Member {
                        name: "new_label",
                        kind: ValueKind::SizedBits(11),
                    },
                ]),
            },
        ),
        (
            "11011100",
            PropertyDescriptor {
                name: "rpc_adjust_position",
                kind: ValueKind::Struct(&[
                    Member {
                        name: "x",
                        kind: ValueKind::Float32,
                    },
                    Member {
                        name: "y",
                        kind: ValueKind::Float32,
                    },
                    Member {
                        name: "z",
                        kind: ValueKind::Float32,
                    },
                    Member {
                        name: "base",
                        kind: ValueKind::SizedBits(32),
                    },
                ]),
            },
        ),
    ],
};

static PAWN: StaticClass = StaticClass {
    key: "01011000000000000000000000000100",
    name: "Pawn",
    properties: &[
        (
            "1010000",
            PropertyDescriptor {
                name: "is_local_owner",
                kind: ValueKind::Bool,
            },
        ),
        (
            "1101000",
            PropertyDescriptor {
                name: "remote_role",
                kind: ValueKind::SizedBits(2),
            },
        ),
        (
            "0000010",
            PropertyDescriptor {
                name: "health",
                kind: ValueKind::Int32,
            },
        ),
        (
            "0101110",
            PropertyDescriptor {
                name: "last_hit_info",
                kind: ValueKind::SizedBits(139),
            },
        ),
    ],
};

static INVENTORY_MANAGER: StaticClass = StaticClass {
    key: "01011000000000000000000000000101",
    name: "InventoryManager",
    properties: &[
        (
            "01111",
            PropertyDescriptor {
                name: "instigator",
                kind: ValueKind::SizedBits(10),
            },
        ),
        (
            "11111",
            PropertyDescriptor {
                name: "owner",
                kind: ValueKind::SizedBits(10),
            },
        ),
    ],
};

static FLAG_CTF: StaticClass = StaticClass {
    key: "01011000000000000000000000000110",
    name: "FlagCTF",
    properties: &[
        (
            "10000",
            PropertyDescriptor {
                name: "collide_actors",
                kind: ValueKind::Bool,
            },
        ),
        (
            "00001",
            PropertyDescriptor {
                name: "location",
                kind: ValueKind::SizedBits(52),
            },
        ),
        (
            "11101",
            PropertyDescriptor {
                name: "team",
                kind: ValueKind::MultipleChoice(11, TEAM),
            },
        ),
    ],
};

static WEAPON: StaticClass = StaticClass {
    key: "01011000000000000000000000000111",
    name: "Weapon",
    properties: &[
        (
            "100001",
            PropertyDescriptor {
                name: "ammo_count",
                kind: ValueKind::SizedBits(64),
            },
        ),
        (
            "010001",
            PropertyDescriptor {
                name: "is_reloading",
                kind: ValueKind::Bool,
            },
        ),
    ],
};

/// Demonstrates the empty-table case: `id_size` falls back to 6.
static STATION_COLLISION: StaticClass = StaticClass {
    key: "01011000000000000000000000001000",
    name: "StationCollision",
    properties: &[],
};

/// Exercises class-key normalization: any 32-bit value whose first five
/// bits are `10001` collapses onto this one entry regardless of its
/// trailing bits.
static BEACON: StaticClass = StaticClass {
    key: "10001000000000000000000000000000",
    name: "Beacon",
    properties: &[(
        "000000",
        PropertyDescriptor {
            name: "pulse_rate",
            kind: ValueKind::Int32,
        },
    )],
};

static STATIC_CLASSES: &[StaticClass] = &[
    GAME_STATE,
    PLAYER_INFO,
    CONTROLLER,
    PAWN,
    INVENTORY_MANAGER,
    FLAG_CTF,
    WEAPON,
    STATION_COLLISION,
    BEACON,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::bytes_to_bits;

    #[test]
    fn normalization_collapses_any_10001_prefixed_key() {
        let mut raw = bytes_to_bits(&[0, 0, 0, 0]);
        // first five consumed bits spell out 1,0,0,0,1
        raw[0] = true;
        raw[4] = true;
        raw[17] = true; // an arbitrary trailing bit that should be masked away
        let normalized = normalize_class_bits(&raw[..32]);
        let beacon_key = crate::bits::key_str_to_u32(BEACON.key);
        assert_eq!(normalized, beacon_key);
    }

    #[test]
    fn empty_table_defaults_id_size_to_six() {
        let registry = Registry::new();
        let key = crate::bits::key_str_to_u32(STATION_COLLISION.key);
        let class = registry.class(ClassKey::Id(key));
        assert_eq!(class.id_size, 6);
    }

    #[test]
    fn non_empty_table_id_size_matches_key_width() {
        let registry = Registry::new();
        let key = crate::bits::key_str_to_u32(FLAG_CTF.key);
        let class = registry.class(ClassKey::Id(key));
        assert_eq!(class.id_size, 5);
    }

    #[test]
    fn unknown_class_registers_with_empty_table() {
        let mut registry = Registry::new();
        let before = registry.classes.len();
        let class = registry.lookup_or_insert(0xabad_1dea);
        assert_eq!(class.name, format!("unknown{before}"));
        assert!(class.properties.is_empty());
        assert_eq!(class.id_size, 6);
    }
}
