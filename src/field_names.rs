use std::fmt;

use serde::{
    ser::{self, Impossible, SerializeStruct},
    Serialize, Serializer,
};

/// The serialized field names of a struct, in declaration order. Anything
/// that does not serialize as a plain struct yields an error.
pub fn field_names<T: Serialize>(value: &T) -> Result<Vec<&'static str>, fmt::Error> {
    let mut serializer = FieldNameSerializer::default();
    value.serialize(&mut serializer)?;
    Ok(serializer.names)
}

#[derive(Default)]
struct FieldNameSerializer {
    names: Vec<&'static str>,
}

impl SerializeStruct for &mut FieldNameSerializer {
    type Ok = ();
    type Error = fmt::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        _value: &T,
    ) -> Result<(), Self::Error> {
        self.names.push(key);
        Ok(())
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<'a> Serializer for &'a mut FieldNameSerializer {
    type Ok = ();
    type Error = fmt::Error;
    type SerializeSeq = Impossible<(), fmt::Error>;
    type SerializeTuple = Impossible<(), fmt::Error>;
    type SerializeTupleStruct = Impossible<(), fmt::Error>;
    type SerializeTupleVariant = Impossible<(), fmt::Error>;
    type SerializeMap = Impossible<(), fmt::Error>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), fmt::Error>;

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self, fmt::Error> {
        self.names.reserve(len);
        Ok(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_i8(self, _v: i8) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_i16(self, _v: i16) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_i32(self, _v: i32) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_i64(self, _v: i64) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_u8(self, _v: u8) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_u16(self, _v: u16) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_u32(self, _v: u32) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_u64(self, _v: u64) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_f32(self, _v: f32) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_f64(self, _v: f64) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_char(self, _v: char) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_str(self, _v: &str) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_none(self) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_unit(self) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), fmt::Error> {
        not_a_struct()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, fmt::Error> {
        not_a_struct()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, fmt::Error> {
        not_a_struct()
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, fmt::Error> {
        not_a_struct()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, fmt::Error> {
        not_a_struct()
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, fmt::Error> {
        not_a_struct()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, fmt::Error> {
        not_a_struct()
    }
}

fn not_a_struct<T>() -> Result<T, fmt::Error> {
    Err(ser::Error::custom("only structs have field names"))
}
