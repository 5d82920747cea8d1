use litematic_nbt::{NBTCompound, NBTList, NBT};
use proptest::prelude::*;

fn arb_leaf() -> impl Strategy<Value = NBT> {
    prop_oneof![
        any::<i8>().prop_map(NBT::Byte),
        any::<i16>().prop_map(NBT::Short),
        any::<i32>().prop_map(NBT::Int),
        any::<i64>().prop_map(NBT::Long),
        // NaN never compares equal, keep to ordinary values.
        proptest::num::f32::NORMAL.prop_map(NBT::Float),
        proptest::num::f64::NORMAL.prop_map(NBT::Double),
        ".{0,16}".prop_map(NBT::String),
        prop::collection::vec(any::<i8>(), 0..16).prop_map(|v| NBT::ByteArray(v.into())),
        prop::collection::vec(any::<i32>(), 0..16).prop_map(|v| NBT::IntArray(v.into())),
        prop::collection::vec(any::<i64>(), 0..16).prop_map(|v| NBT::LongArray(v.into())),
    ]
}

fn arb_compound(inner: impl Strategy<Value = NBT>) -> impl Strategy<Value = NBTCompound> {
    prop::collection::vec(("[a-zA-Z_:]{0,8}", inner), 0..6)
        .prop_map(|entries| entries.into_iter().collect::<NBTCompound>())
}

fn arb_list(inner: impl Strategy<Value = NBT>) -> impl Strategy<Value = NBTList> {
    prop::collection::vec(inner, 0..5).prop_map(|items| {
        let mut list = NBTList::new();
        // Items that disagree with the first one's tag are dropped.
        items.into_iter().for_each(|item| {
            let _ = list.push(item);
        });
        list
    })
}

fn arb_nbt() -> impl Strategy<Value = NBT> {
    arb_leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            arb_list(inner.clone()).prop_map(NBT::List),
            arb_compound(inner).prop_map(NBT::Compound),
        ]
    })
}

proptest! {
    #[test]
    fn encode_then_decode_is_identity(
        name in "[a-zA-Z]{0,8}",
        root in arb_compound(arb_nbt()),
        compressed in any::<bool>(),
    ) {
        let root = NBT::Compound(root);
        let binary = root.to_bytes(&name, compressed).unwrap();
        let (parsed_name, parsed) = NBT::from_bytes(&binary, compressed).unwrap();
        prop_assert_eq!(parsed_name, name);
        prop_assert_eq!(NBT::Compound(parsed), root);
    }

    #[test]
    fn every_strict_prefix_fails(
        root in arb_compound(arb_nbt()),
        cut in any::<prop::sample::Index>(),
    ) {
        let binary = NBT::Compound(root).to_bytes("root", false).unwrap();
        let cut = cut.index(binary.len());
        prop_assert!(NBT::from_bytes(&binary[..cut], false).is_err());
    }
}
