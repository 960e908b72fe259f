//! Fixed topic catalogue backing the numeric room-code path.
//!
//! The packing arithmetic in [`crate::code`] treats the topic list and each
//! topic's word list as fixed ordered vocabularies, so the order of entries
//! here is part of the code format. Append-only; never reorder.

use crate::rng::SeededRng;

#[derive(Debug, Clone, Copy)]
pub struct Topic {
    pub id: &'static str,
    pub label: &'static str,
    pub words: &'static [&'static str],
}

/// Every topic carries exactly this many words so the word index packs into
/// a uniform radix.
pub const WORDS_PER_TOPIC: usize = 20;

pub const TOPICS: [Topic; 8] = [
    Topic {
        id: "animals",
        label: "Animals",
        words: &[
            "Cat", "Dog", "Elephant", "Penguin", "Dolphin", "Giraffe", "Tiger", "Rabbit",
            "Octopus", "Kangaroo", "Owl", "Shark", "Horse", "Panda", "Crocodile", "Parrot",
            "Squirrel", "Camel", "Hedgehog", "Flamingo",
        ],
    },
    Topic {
        id: "food",
        label: "Food & Drink",
        words: &[
            "Pizza", "Sushi", "Pancake", "Dumpling", "Burger", "Noodles", "Chocolate", "Cheese",
            "Ice cream", "Sandwich", "Spring roll", "Lemonade", "Popcorn", "Waffle", "Curry",
            "Taco", "Omelette", "Yogurt", "Pretzel", "Smoothie",
        ],
    },
    Topic {
        id: "places",
        label: "Places",
        words: &[
            "Airport", "Library", "Hospital", "Beach", "Cinema", "Supermarket", "Museum", "Zoo",
            "Stadium", "Bakery", "Lighthouse", "Campsite", "Castle", "Subway station", "Desert",
            "Waterfall", "Farm", "Harbor", "Playground", "Observatory",
        ],
    },
    Topic {
        id: "objects",
        label: "Household Objects",
        words: &[
            "Umbrella", "Scissors", "Kettle", "Mirror", "Pillow", "Flashlight", "Ladder",
            "Toothbrush", "Backpack", "Candle", "Stapler", "Blanket", "Doorbell", "Vacuum",
            "Clothespin", "Thermometer", "Corkscrew", "Broom", "Alarm clock", "Magnet",
        ],
    },
    Topic {
        id: "jobs",
        label: "Jobs",
        words: &[
            "Firefighter", "Dentist", "Pilot", "Chef", "Plumber", "Teacher", "Magician",
            "Librarian", "Astronaut", "Barber", "Detective", "Lifeguard", "Carpenter",
            "Photographer", "Referee", "Veterinarian", "Electrician", "Tailor", "Locksmith",
            "Beekeeper",
        ],
    },
    Topic {
        id: "sports",
        label: "Sports & Games",
        words: &[
            "Chess", "Bowling", "Archery", "Surfing", "Marathon", "Ping pong", "Darts", "Judo",
            "Ice skating", "Rock climbing", "Billiards", "Fencing", "Badminton", "Skateboarding",
            "Tug of war", "Hide and seek", "Golf", "Rowing", "Trampoline", "Hopscotch",
        ],
    },
    Topic {
        id: "transport",
        label: "Transportation",
        words: &[
            "Bicycle", "Helicopter", "Submarine", "Tram", "Scooter", "Ferry", "Hot air balloon",
            "Train", "Ambulance", "Skateboard", "Canoe", "Cable car", "Motorcycle", "Rickshaw",
            "Sailboat", "Fire truck", "Rocket", "Tractor", "Unicycle", "Zeppelin",
        ],
    },
    Topic {
        id: "nature",
        label: "Nature & Weather",
        words: &[
            "Rainbow", "Volcano", "Glacier", "Thunderstorm", "Cactus", "Coral reef", "Tornado",
            "Bamboo", "Meteor", "Fog", "Sand dune", "Geyser", "Avalanche", "Sunflower",
            "Quicksand", "Aurora", "Hailstorm", "Mushroom", "Tide pool", "Lightning",
        ],
    },
];

pub fn topic(index: usize) -> Option<&'static Topic> {
    TOPICS.get(index)
}

/// Index of the topic with the given display label, if it is a catalogue topic.
pub fn find_topic(label: &str) -> Option<usize> {
    TOPICS.iter().position(|t| t.label == label)
}

/// Catalogue coordinates of `(topic_label, word)`, or `None` when either
/// falls outside the fixed vocabulary.
pub fn lookup(topic_label: &str, word: &str) -> Option<(usize, usize)> {
    let topic_index = find_topic(topic_label)?;
    let word_index = TOPICS[topic_index].words.iter().position(|w| *w == word)?;
    Some((topic_index, word_index))
}

/// Draw a random (topic, word) pair. Callers pass a non-deterministic
/// generator; this draw never needs cross-device agreement.
pub fn draw(rng: &mut SeededRng) -> (&'static Topic, &'static str) {
    let topic = &TOPICS[rng.next_below(TOPICS.len())];
    let word = topic.words[rng.next_below(topic.words.len())];
    (topic, word)
}
