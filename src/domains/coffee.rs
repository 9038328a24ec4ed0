//! Coffee delivery: robots carry drinks from kitchens to offices through
//! doors.
//!
//! Only the world structure is indexed (rooms, doors, drinks and door-based
//! adjacency). The timeline is checked with the generic STRIPS checks alone;
//! there is no delivery replay yet.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::Diagnostic;
use crate::facts::{Fact, FactPattern, Field, PatternTable};
use crate::plan::Plan;
use crate::validator::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomKind {
    #[default]
    Plain,
    Office,
    Kitchen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub name: String,
    pub kind: RoomKind,
    pub drinks: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Door {
    pub name: String,
    /// The two rooms the door joins, once a `connected/3` names it.
    pub rooms: Option<(String, String)>,
    pub open: bool,
}

impl Door {
    /// Doors start closed.
    pub fn closed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rooms: None,
            open: false,
        }
    }
}

enum CoffeeFact {
    Door(String),
    Room(String, RoomKind),
    Drink(String),
    Connected {
        src: String,
        dst: String,
        door: String,
    },
}

static COFFEE_PATTERNS: [FactPattern<CoffeeFact>; 6] = [
    FactPattern::new("door", &[Field::Any], |v| match v {
        [name] => Some(CoffeeFact::Door(name.to_string())),
        _ => None,
    }),
    FactPattern::new("room", &[Field::Any], |v| match v {
        [name] => Some(CoffeeFact::Room(name.to_string(), RoomKind::Plain)),
        _ => None,
    }),
    FactPattern::new("office", &[Field::Any], |v| match v {
        [name] => Some(CoffeeFact::Room(name.to_string(), RoomKind::Office)),
        _ => None,
    }),
    FactPattern::new("kitchen", &[Field::Any], |v| match v {
        [name] => Some(CoffeeFact::Room(name.to_string(), RoomKind::Kitchen)),
        _ => None,
    }),
    FactPattern::new("drink", &[Field::Any], |v| match v {
        [name] => Some(CoffeeFact::Drink(name.to_string())),
        _ => None,
    }),
    FactPattern::new("connected", &[Field::Any, Field::Any, Field::Any], |v| match v {
        [src, dst, door] => Some(CoffeeFact::Connected {
            src: src.to_string(),
            dst: dst.to_string(),
            door: door.to_string(),
        }),
        _ => None,
    }),
];

static COFFEE_TABLE: PatternTable<CoffeeFact> = PatternTable::new(&COFFEE_PATTERNS);

#[derive(Debug, Clone, Default)]
pub struct CoffeeDelivery {
    pub rooms: BTreeMap<String, Room>,
    pub doors: BTreeMap<String, Door>,
    pub drinks: BTreeSet<String>,
    pub adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl CoffeeDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rooms reachable from `room` through a single door.
    pub fn neighbors(&self, room: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(room)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    fn room_mut(&mut self, name: &str) -> &mut Room {
        self.rooms.entry(name.to_string()).or_insert_with(|| Room {
            name: name.to_string(),
            kind: RoomKind::Plain,
            drinks: BTreeSet::new(),
        })
    }
}

impl Domain for CoffeeDelivery {
    fn name(&self) -> &'static str {
        "coffee"
    }

    fn parse_extra(&mut self, fact: &Fact) -> bool {
        let Some(record) = COFFEE_TABLE.recognize(fact) else {
            return false;
        };
        match record {
            CoffeeFact::Door(name) => {
                self.doors
                    .entry(name.clone())
                    .or_insert_with(|| Door::closed(name));
            }
            CoffeeFact::Room(name, kind) => {
                let room = self.room_mut(&name);
                // A specialisation wins over a plain `room/1`, whatever the order.
                if kind != RoomKind::Plain {
                    room.kind = kind;
                }
            }
            CoffeeFact::Drink(name) => {
                self.drinks.insert(name);
            }
            CoffeeFact::Connected { src, dst, door } => {
                self.doors
                    .entry(door.clone())
                    .or_insert_with(|| Door::closed(door))
                    .rooms = Some((src.clone(), dst.clone()));
                self.adjacency
                    .entry(src.clone())
                    .or_default()
                    .insert(dst.clone());
                self.adjacency.entry(dst).or_default().insert(src);
            }
        }
        true
    }

    fn verify(&self, plan: Option<&Plan>) -> Vec<Diagnostic> {
        plan.map(Plan::generic_checks).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    fn world(raw: &[&str]) -> CoffeeDelivery {
        let mut coffee = CoffeeDelivery::new();
        for fact in Fact::parse_all(raw).expect("facts") {
            assert!(coffee.parse_extra(&fact), "unclaimed {fact}");
        }
        coffee
    }

    #[test]
    fn specialised_rooms_keep_their_kind() {
        let coffee = world(&["office(o1)", "room(o1)", "room(hall)", "kitchen(k)"]);
        assert_eq!(coffee.rooms["o1"].kind, RoomKind::Office);
        assert_eq!(coffee.rooms["hall"].kind, RoomKind::Plain);
        assert_eq!(coffee.rooms["k"].kind, RoomKind::Kitchen);
    }

    #[test]
    fn doors_are_closed_and_join_two_rooms() {
        let coffee = world(&["door(d1)", "connected(hall,k,d1)", "connected(hall,o1,d2)"]);
        let d1 = &coffee.doors["d1"];
        assert!(!d1.open);
        assert_eq!(d1.rooms, Some(("hall".to_string(), "k".to_string())));
        assert!(coffee.doors.contains_key("d2"));
        assert_eq!(coffee.neighbors("hall").collect::<Vec<_>>(), vec!["k", "o1"]);
        assert_eq!(coffee.neighbors("k").collect::<Vec<_>>(), vec!["hall"]);
        assert_eq!(coffee.neighbors("attic").count(), 0);
    }

    #[test]
    fn only_generic_checks_apply() {
        let v = Validator::new(
            Box::new(CoffeeDelivery::new()),
            &["time(0)", "drink(latte)", "goal(served(latte))", "exec(0,teleport(latte))"],
        )
        .expect("validator");
        assert!(v.is_valid());
        assert_eq!(v.validate().logs.len(), 1);
    }
}
