#![no_main]

use libfuzzer_sys::fuzz_target;
use ssz_tree::{complex_list_root, ListTree, Node, Root, Sha256Hasher};

/// Replay append/pop/set against a plain vector and compare roots
fuzz_target!(|data: &[u8]| {
    let Some((&limit_byte, ops)) = data.split_first() else {
        return;
    };
    let limit = u64::from(limit_byte);
    let mut list: ListTree = ListTree::new(limit);
    let mut model: Vec<Root> = Vec::new();

    for pair in ops.chunks(2) {
        let value = Root::repeat_byte(pair.get(1).copied().unwrap_or(1));
        match pair[0] % 3 {
            0 => {
                let appended = list.append(Node::leaf(value)).is_ok();
                assert_eq!(appended, (model.len() as u64) < limit);
                if appended {
                    model.push(value);
                }
            }
            1 => {
                let popped = list.pop().ok();
                let expected = model.pop();
                assert_eq!(popped.map(|n| n.merkle_root(&Sha256Hasher)), expected);
            }
            _ => {
                let i = u64::from(pair[0] / 3);
                let ok = list.set(i, Node::leaf(value)).is_ok();
                assert_eq!(ok, (i as usize) < model.len());
                if ok {
                    model[i as usize] = value;
                }
            }
        }
        assert_eq!(list.len(), model.len() as u64);
    }

    assert_eq!(list.root(), complex_list_root(&Sha256Hasher, &model, limit));
});
