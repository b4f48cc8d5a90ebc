mod where_clause;

pub use self::where_clause::WhereClause;
