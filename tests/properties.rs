//! Property-based tests for the encode/drain protocol.
//!
//! Uses proptest to generate random work sequences and verify that:
//! 1. Records drain in exactly the order they were encoded
//! 2. Decoded values equal encoded values
//! 3. Cursor invariant holds after every operation
//! 4. Draining an empty pipe executes nothing

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use workpipe::codec::{len_prefixed_size, u32_list_size, PayloadReader, PayloadWriter};
use workpipe::handler::{DecodeWork, TypedExecutor};
use workpipe::{OffloadContext, Result, WorkEncoder};

#[derive(Debug, Clone, PartialEq)]
struct Number(u32);

impl WorkEncoder for Number {
    fn required_size(&self) -> usize {
        4
    }

    fn write_payload(&self, out: &mut PayloadWriter<'_>) -> Result<()> {
        out.put_u32(self.0)
    }
}

impl DecodeWork for Number {
    fn decode(reader: &mut PayloadReader<'_>) -> Result<Self> {
        Ok(Number(reader.read_u32()?))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Note {
    text: String,
    tags: Vec<u32>,
}

impl WorkEncoder for Note {
    fn required_size(&self) -> usize {
        len_prefixed_size(self.text.len()) + u32_list_size(self.tags.len())
    }

    fn write_payload(&self, out: &mut PayloadWriter<'_>) -> Result<()> {
        out.put_str(&self.text)?;
        out.put_u32_list(&self.tags)
    }
}

impl DecodeWork for Note {
    fn decode(reader: &mut PayloadReader<'_>) -> Result<Self> {
        Ok(Note {
            text: reader.read_str()?.to_string(),
            tags: reader.read_u32_list()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Number(Number),
    Note(Note),
}

// =============================================================================
// STRATEGIES
// =============================================================================

fn item_strategy() -> impl Strategy<Value = Item> {
    prop_oneof![
        any::<u32>().prop_map(|v| Item::Number(Number(v))),
        (".{0,40}", prop::collection::vec(any::<u32>(), 0..16))
            .prop_map(|(text, tags)| Item::Note(Note { text, tags })),
    ]
}

/// Either encode an item or drain everything committed so far.
#[derive(Debug, Clone)]
enum Op {
    Encode(Item),
    Drain,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => item_strategy().prop_map(Op::Encode),
        1 => Just(Op::Drain),
    ]
}

fn context(capacity: usize, compact: bool) -> (OffloadContext, Arc<Mutex<Vec<Item>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut ctx = OffloadContext::with_parts(
        workpipe::protocol::Pipe::with_capacity(capacity),
        Arc::new(workpipe::WorkRegistry::new()),
    )
    .compact_on_drain(compact);

    let numbers = seen.clone();
    ctx.register::<Number, _>(TypedExecutor::new(move |n: Number| {
        numbers.lock().push(Item::Number(n));
        Ok(())
    }))
    .unwrap();

    let notes = seen.clone();
    ctx.register::<Note, _>(TypedExecutor::new(move |n: Note| {
        notes.lock().push(Item::Note(n));
        Ok(())
    }))
    .unwrap();

    (ctx, seen)
}

fn encode(ctx: &mut OffloadContext, item: &Item) -> usize {
    match item {
        Item::Number(n) => ctx.encode(n).unwrap(),
        Item::Note(n) => ctx.encode(n).unwrap(),
    }
}

fn assert_cursors(ctx: &OffloadContext) {
    let pipe = ctx.pipe();
    assert!(pipe.read_cursor() <= pipe.write_cursor());
    assert!(pipe.write_cursor() <= pipe.capacity());
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn fifo_roundtrip(items in prop::collection::vec(item_strategy(), 0..64)) {
        let (mut ctx, seen) = context(16, false);

        let mut expected_bytes = 0;
        for item in &items {
            expected_bytes += encode(&mut ctx, item);
        }
        let stats = ctx.drain().unwrap();

        prop_assert_eq!(stats.records, items.len());
        prop_assert_eq!(stats.bytes, expected_bytes);
        prop_assert_eq!(&*seen.lock(), &items);
        prop_assert_eq!(ctx.pipe().read_cursor(), ctx.pipe().write_cursor());
    }

    #[test]
    fn interleaved_encode_drain(
        ops in prop::collection::vec(op_strategy(), 0..100),
        compact in any::<bool>(),
    ) {
        let (mut ctx, seen) = context(32, compact);
        let mut expected = Vec::new();

        for op in &ops {
            match op {
                Op::Encode(item) => {
                    encode(&mut ctx, item);
                    expected.push(item.clone());
                }
                Op::Drain => {
                    ctx.drain().unwrap();
                    prop_assert_eq!(&*seen.lock(), &expected);
                }
            }
            assert_cursors(&ctx);
        }

        ctx.drain().unwrap();
        prop_assert_eq!(&*seen.lock(), &expected);
        assert_cursors(&ctx);
    }

    #[test]
    fn drain_of_drained_pipe_is_noop(items in prop::collection::vec(item_strategy(), 0..16)) {
        let (mut ctx, seen) = context(64, false);
        for item in &items {
            encode(&mut ctx, item);
        }
        ctx.drain().unwrap();

        let executed = seen.lock().len();
        let read = ctx.pipe().read_cursor();
        let write = ctx.pipe().write_cursor();

        let stats = ctx.drain().unwrap();

        prop_assert_eq!(stats.records, 0);
        prop_assert_eq!(seen.lock().len(), executed);
        prop_assert_eq!(ctx.pipe().read_cursor(), read);
        prop_assert_eq!(ctx.pipe().write_cursor(), write);
    }

    #[test]
    fn consumption_matches_required_size(item in item_strategy()) {
        let (mut ctx, _) = context(0, false);
        let used = encode(&mut ctx, &item);
        let expected = match &item {
            Item::Number(n) => n.encoded_size(),
            Item::Note(n) => n.encoded_size(),
        };

        prop_assert_eq!(used, expected);
        prop_assert_eq!(ctx.drain().unwrap().bytes, expected);
    }
}
