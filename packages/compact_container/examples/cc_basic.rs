//! Basic usage of the `compact_container` crate:
//!
//! * Creating a container.
//! * Adding items.
//! * Retrieving items by index.
//! * Erasing items and seeing their indices reused.
//! * Iterating in index order.

use compact_container::CompactContainer;

fn main() {
    let mut container = CompactContainer::<String>::new();

    // Inserting an item gives you an index that you can later use to look up the item again.
    let alice = container.insert("Alice".to_string());
    let bob = container.insert("Bob".to_string());
    let charlie = container.insert("Charlie".to_string());

    println!(
        "Container holds {} items, with an auto-adjusting capacity of {}",
        container.len(),
        container.capacity()
    );

    // Retrieving items is a plain array lookup.
    println!("Item {alice}: {}", container[alice]);

    container.erase(bob);

    // The slot Bob occupied is the first to be handed out again.
    let dave = container.insert("Dave".to_string());
    println!("Dave was assigned index {dave}, previously Bob's ({bob})");

    container[charlie].push_str(" Smith");

    for (index, name) in &container {
        println!("{index}: {name}");
    }
}
