use crate::error::Result;
use crate::model::{
    Approval, ApprovalStatus, Book, Enrollment, FinancialOverview, ItemKind, ItemRecord, Material,
    Role, Room, Staff, Student,
};
use crate::store::{ApprovalUpdate, RecordStore};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

pub const DB_FILE_NAME: &str = "eclari.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff(
            id TEXT PRIMARY KEY,
            auth_uid TEXT UNIQUE,
            role TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            hall_name TEXT,
            specialization TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            auth_uid TEXT UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            year_group INTEGER NOT NULL DEFAULT 2
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            teacher_id TEXT,
            year_group INTEGER,
            color_block TEXT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(teacher_id) REFERENCES staff(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_teacher ON classes(teacher_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            PRIMARY KEY(student_id, class_id),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;

    // Books and materials share the approval columns; subject_id is free text
    // because lab/sports categories are not academic subjects.
    for table in ["books", "materials"] {
        let label_col = if table == "books" { "title" } else { "name" };
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table}(
                    id TEXT PRIMARY KEY,
                    student_id TEXT NOT NULL,
                    subject_id TEXT NOT NULL,
                    {label_col} TEXT NOT NULL,
                    returned INTEGER NOT NULL DEFAULT 0,
                    approval_status TEXT NOT NULL DEFAULT 'none',
                    image_proof_url TEXT,
                    submitted_at TEXT,
                    rejection_reason TEXT,
                    approved_by TEXT,
                    approved_at TEXT,
                    FOREIGN KEY(student_id) REFERENCES students(id)
                )"
            ),
            [],
        )?;
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS idx_{table}_student ON {table}(student_id)"),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_subject_status ON {table}(subject_id, approval_status)"
            ),
            [],
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS finance(
            student_id TEXT PRIMARY KEY,
            tuition_due REAL NOT NULL,
            amount_paid REAL NOT NULL DEFAULT 0,
            balance REAL NOT NULL,
            status TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rooms(
            id TEXT NOT NULL,
            hall_id TEXT NOT NULL,
            student_id TEXT,
            room_status TEXT NOT NULL DEFAULT 'pending_inspection',
            hall_clearance_status TEXT NOT NULL DEFAULT 'pending',
            PRIMARY KEY(hall_id, id),
            FOREIGN KEY(hall_id) REFERENCES staff(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rooms_student ON rooms(student_id)",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

const STUDENT_COLS: &str = "id, first_name, last_name, year_group, auth_uid";
const STAFF_COLS: &str = "id, auth_uid, role, first_name, last_name, hall_name, specialization";
const ITEM_TAIL_COLS: &str =
    "returned, approval_status, image_proof_url, submitted_at, rejection_reason, approved_by, approved_at";

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        first_name: r.get(1)?,
        last_name: r.get(2)?,
        year_group: r.get(3)?,
        auth_uid: r.get(4)?,
    })
}

fn staff_from_row(r: &Row<'_>) -> rusqlite::Result<Staff> {
    let role_raw: String = r.get(2)?;
    let role = Role::parse(&role_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown staff role {:?}", role_raw).into(),
        )
    })?;
    Ok(Staff {
        id: r.get(0)?,
        auth_uid: r.get(1)?,
        role,
        first_name: r.get(3)?,
        last_name: r.get(4)?,
        hall_name: r.get(5)?,
        specialization: r.get(6)?,
    })
}

/// Reads `returned` and the approval columns starting at `base`.
fn item_tail_from_row(r: &Row<'_>, base: usize) -> rusqlite::Result<(bool, Approval)> {
    let returned: i64 = r.get(base)?;
    let status: String = r.get(base + 1)?;
    Ok((
        returned != 0,
        Approval {
            status: ApprovalStatus::parse(&status),
            image_proof_url: r.get(base + 2)?,
            submitted_at: r.get(base + 3)?,
            rejection_reason: r.get(base + 4)?,
            approved_by: r.get(base + 5)?,
            approved_at: r.get(base + 6)?,
        },
    ))
}

fn book_from_row(r: &Row<'_>) -> rusqlite::Result<Book> {
    let (returned, approval) = item_tail_from_row(r, 4)?;
    Ok(Book {
        id: r.get(0)?,
        student_id: r.get(1)?,
        subject_id: r.get(2)?,
        title: r.get(3)?,
        returned,
        approval,
    })
}

fn material_from_row(r: &Row<'_>) -> rusqlite::Result<Material> {
    let (returned, approval) = item_tail_from_row(r, 4)?;
    Ok(Material {
        id: r.get(0)?,
        student_id: r.get(1)?,
        subject_id: r.get(2)?,
        name: r.get(3)?,
        returned,
        approval,
    })
}

fn book_select() -> String {
    format!("SELECT id, student_id, subject_id, title, {} FROM books", ITEM_TAIL_COLS)
}

fn material_select() -> String {
    format!("SELECT id, student_id, subject_id, name, {} FROM materials", ITEM_TAIL_COLS)
}

fn finance_from_row(r: &Row<'_>) -> rusqlite::Result<FinancialOverview> {
    Ok(FinancialOverview {
        student_id: r.get(0)?,
        tuition_due: r.get(1)?,
        amount_paid: r.get(2)?,
        balance: r.get(3)?,
        status: r.get(4)?,
    })
}

fn item_table(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Book => "books",
        ItemKind::Material => "materials",
    }
}

/// Record store over one workspace connection. Built per request; it keeps
/// nothing besides the borrowed connection.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &'a Connection {
        self.conn
    }

    pub fn insert_subject(&self, id: &str, name: &str) -> Result<()> {
        self.conn
            .execute("INSERT INTO subjects(id, name) VALUES(?, ?)", (id, name))?;
        Ok(())
    }

    pub fn insert_staff(&self, staff: &Staff) -> Result<()> {
        self.conn.execute(
            "INSERT INTO staff(id, auth_uid, role, first_name, last_name, hall_name, specialization)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                &staff.id,
                &staff.auth_uid,
                staff.role.as_str(),
                &staff.first_name,
                &staff.last_name,
                &staff.hall_name,
                &staff.specialization,
            ),
        )?;
        Ok(())
    }

    pub fn set_staff_role(&self, staff_id: &str, role: Role) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE staff SET role = ? WHERE id = ?",
            (role.as_str(), staff_id),
        )?;
        Ok(n > 0)
    }

    pub fn insert_student(&self, student: &Student) -> Result<()> {
        self.conn.execute(
            "INSERT INTO students(id, auth_uid, first_name, last_name, year_group)
             VALUES(?, ?, ?, ?, ?)",
            (
                &student.id,
                &student.auth_uid,
                &student.first_name,
                &student.last_name,
                student.year_group,
            ),
        )?;
        Ok(())
    }

    pub fn insert_class(
        &self,
        id: &str,
        name: &str,
        subject_id: &str,
        teacher_id: Option<&str>,
        year_group: Option<i64>,
        color_block: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO classes(id, name, subject_id, teacher_id, year_group, color_block)
             VALUES(?, ?, ?, ?, ?, ?)",
            (id, name, subject_id, teacher_id, year_group, color_block),
        )?;
        Ok(())
    }

    pub fn insert_enrollment(&self, student_id: &str, class_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO enrollments(student_id, class_id) VALUES(?, ?)",
            (student_id, class_id),
        )?;
        Ok(())
    }

    pub fn insert_item(
        &self,
        kind: ItemKind,
        id: &str,
        student_id: &str,
        subject_id: &str,
        label: &str,
        returned: bool,
    ) -> Result<()> {
        let label_col = match kind {
            ItemKind::Book => "title",
            ItemKind::Material => "name",
        };
        self.conn.execute(
            &format!(
                "INSERT INTO {}(id, student_id, subject_id, {}, returned) VALUES(?, ?, ?, ?, ?)",
                item_table(kind),
                label_col
            ),
            (id, student_id, subject_id, label, returned as i64),
        )?;
        Ok(())
    }

    /// Books filtered by owner and/or subject; both `None` lists everything.
    pub fn list_books(&self, student_id: Option<&str>, subject_id: Option<&str>) -> Result<Vec<Book>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR student_id = ?1) AND (?2 IS NULL OR subject_id = ?2) ORDER BY id",
            book_select()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map((student_id, subject_id), book_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_materials(
        &self,
        student_id: Option<&str>,
        subject_id: Option<&str>,
    ) -> Result<Vec<Material>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR student_id = ?1) AND (?2 IS NULL OR subject_id = ?2) ORDER BY id",
            material_select()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map((student_id, subject_id), material_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Books awaiting a decision in any subject the teacher has a class in.
    pub fn pending_books_for_teacher(&self, teacher_id: &str) -> Result<Vec<Book>> {
        let sql = format!(
            "{} WHERE approval_status = 'pending'
               AND image_proof_url IS NOT NULL
               AND subject_id IN (SELECT subject_id FROM classes WHERE teacher_id = ?)
             ORDER BY submitted_at, id",
            book_select()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([teacher_id], book_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn teaches_subject(&self, teacher_id: &str, subject_id: &str) -> Result<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM classes WHERE teacher_id = ? AND subject_id = ?",
            (teacher_id, subject_id),
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn pending_materials_for_subject(&self, subject_id: &str) -> Result<Vec<Material>> {
        let sql = format!(
            "{} WHERE approval_status = 'pending'
               AND image_proof_url IS NOT NULL
               AND subject_id = ?
             ORDER BY submitted_at, id",
            material_select()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([subject_id], material_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn pending_materials_for_teacher(&self, teacher_id: &str) -> Result<Vec<Material>> {
        let sql = format!(
            "{} WHERE approval_status = 'pending'
               AND image_proof_url IS NOT NULL
               AND subject_id NOT IN ('SCI', 'PE')
               AND subject_id IN (SELECT subject_id FROM classes WHERE teacher_id = ?)
             ORDER BY submitted_at, id",
            material_select()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([teacher_id], material_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn insert_finance(&self, record: &FinancialOverview) -> Result<()> {
        self.conn.execute(
            "INSERT INTO finance(student_id, tuition_due, amount_paid, balance, status)
             VALUES(?, ?, ?, ?, ?)",
            (
                &record.student_id,
                record.tuition_due,
                record.amount_paid,
                record.balance,
                &record.status,
            ),
        )?;
        Ok(())
    }

    pub fn update_finance(&self, record: &FinancialOverview) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE finance SET amount_paid = ?, balance = ?, status = ? WHERE student_id = ?",
            (
                record.amount_paid,
                record.balance,
                &record.status,
                &record.student_id,
            ),
        )?;
        Ok(n > 0)
    }

    pub fn list_finance(&self) -> Result<Vec<(FinancialOverview, Student)>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.student_id, f.tuition_due, f.amount_paid, f.balance, f.status,
                    s.id, s.first_name, s.last_name, s.year_group, s.auth_uid
             FROM finance f
             JOIN students s ON s.id = f.student_id
             ORDER BY s.last_name, s.first_name, s.id",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    finance_from_row(r)?,
                    Student {
                        id: r.get(5)?,
                        first_name: r.get(6)?,
                        last_name: r.get(7)?,
                        year_group: r.get(8)?,
                        auth_uid: r.get(9)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn insert_room(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rooms(id, hall_id, student_id, room_status, hall_clearance_status)
             VALUES(?, ?, ?, ?, ?)",
            (
                &room.id,
                &room.hall_id,
                &room.student_id,
                &room.room_status,
                &room.hall_clearance_status,
            ),
        )?;
        Ok(())
    }

    /// Occupied rooms of a hall with their students.
    pub fn hall_rooms(&self, hall_id: &str) -> Result<Vec<(Room, Student)>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.hall_id, r.student_id, r.room_status, r.hall_clearance_status,
                    s.id, s.first_name, s.last_name, s.year_group, s.auth_uid
             FROM rooms r
             JOIN students s ON s.id = r.student_id
             WHERE r.hall_id = ?
             ORDER BY r.id",
        )?;
        let rows = stmt
            .query_map([hall_id], |r| {
                Ok((
                    Room {
                        id: r.get(0)?,
                        hall_id: r.get(1)?,
                        student_id: r.get(2)?,
                        room_status: r.get(3)?,
                        hall_clearance_status: r.get(4)?,
                    },
                    Student {
                        id: r.get(5)?,
                        first_name: r.get(6)?,
                        last_name: r.get(7)?,
                        year_group: r.get(8)?,
                        auth_uid: r.get(9)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_room(&self, hall_id: &str, room_id: &str) -> Result<Option<Room>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, hall_id, student_id, room_status, hall_clearance_status
                 FROM rooms WHERE hall_id = ? AND id = ?",
                (hall_id, room_id),
                |r| {
                    Ok(Room {
                        id: r.get(0)?,
                        hall_id: r.get(1)?,
                        student_id: r.get(2)?,
                        room_status: r.get(3)?,
                        hall_clearance_status: r.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn update_room_status(
        &self,
        hall_id: &str,
        room_id: &str,
        room_status: &str,
        hall_clearance_status: &str,
    ) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE rooms SET room_status = ?, hall_clearance_status = ? WHERE hall_id = ? AND id = ?",
            (room_status, hall_clearance_status, hall_id, room_id),
        )?;
        Ok(n > 0)
    }

    pub fn get_student_room(&self, student_id: &str) -> Result<Option<Room>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, hall_id, student_id, room_status, hall_clearance_status
                 FROM rooms WHERE student_id = ? ORDER BY hall_id, id LIMIT 1",
                [student_id],
                |r| {
                    Ok(Room {
                        id: r.get(0)?,
                        hall_id: r.get(1)?,
                        student_id: r.get(2)?,
                        room_status: r.get(3)?,
                        hall_clearance_status: r.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// Case-insensitive match on id, first or last name.
    pub fn search_students(&self, term: &str, limit: i64) -> Result<Vec<Student>> {
        let pattern = format!("%{}%", term.trim().to_ascii_lowercase());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM students
             WHERE lower(id) LIKE ?1 OR lower(first_name) LIKE ?1 OR lower(last_name) LIKE ?1
             ORDER BY last_name, first_name, id
             LIMIT ?2",
            STUDENT_COLS
        ))?;
        let rows = stmt
            .query_map((pattern, limit), student_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl RecordStore for SqliteStore<'_> {
    fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLS),
                [student_id],
                student_from_row,
            )
            .optional()?)
    }

    fn get_staff_by_auth_uid(&self, auth_uid: &str) -> Result<Option<Staff>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM staff WHERE auth_uid = ?", STAFF_COLS),
                [auth_uid],
                staff_from_row,
            )
            .optional()?)
    }

    fn get_student_by_auth_uid(&self, auth_uid: &str) -> Result<Option<Student>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM students WHERE auth_uid = ?", STUDENT_COLS),
                [auth_uid],
                student_from_row,
            )
            .optional()?)
    }

    fn get_books_for_student(&self, student_id: &str) -> Result<Vec<Book>> {
        self.list_books(Some(student_id), None)
    }

    fn get_materials_for_student(&self, student_id: &str) -> Result<Vec<Material>> {
        self.list_materials(Some(student_id), None)
    }

    fn get_financial_overview(&self, student_id: &str) -> Result<Option<FinancialOverview>> {
        Ok(self
            .conn
            .query_row(
                "SELECT student_id, tuition_due, amount_paid, balance, status
                 FROM finance WHERE student_id = ?",
                [student_id],
                finance_from_row,
            )
            .optional()?)
    }

    fn get_enrollments(&self, student_id: &str) -> Result<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, sub.id, sub.name
             FROM enrollments e
             JOIN classes c ON c.id = e.class_id
             JOIN subjects sub ON sub.id = c.subject_id
             WHERE e.student_id = ?
             ORDER BY sub.name, c.name",
        )?;
        let rows = stmt
            .query_map([student_id], |r| {
                Ok(Enrollment {
                    class_id: r.get(0)?,
                    class_name: r.get(1)?,
                    subject_id: r.get(2)?,
                    subject_name: r.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn get_book(&self, book_id: &str) -> Result<Option<Book>> {
        Ok(self
            .conn
            .query_row(&format!("{} WHERE id = ?", book_select()), [book_id], book_from_row)
            .optional()?)
    }

    fn get_material(&self, material_id: &str) -> Result<Option<Material>> {
        Ok(self
            .conn
            .query_row(
                &format!("{} WHERE id = ?", material_select()),
                [material_id],
                material_from_row,
            )
            .optional()?)
    }

    fn set_book_approval(&self, book_id: &str, update: &ApprovalUpdate) -> Result<Option<Book>> {
        if write_approval(self.conn, ItemKind::Book, book_id, update)? {
            self.get_book(book_id)
        } else {
            Ok(None)
        }
    }

    fn set_material_approval(
        &self,
        material_id: &str,
        update: &ApprovalUpdate,
    ) -> Result<Option<Material>> {
        if write_approval(self.conn, ItemKind::Material, material_id, update)? {
            self.get_material(material_id)
        } else {
            Ok(None)
        }
    }

    fn record_proof_submission(
        &self,
        kind: ItemKind,
        item_id: &str,
        proof_url: &str,
        submitted_at: &str,
    ) -> Result<Option<ItemRecord>> {
        let n = self.conn.execute(
            &format!(
                "UPDATE {} SET approval_status = 'pending', image_proof_url = ?, submitted_at = ?
                 WHERE id = ?",
                item_table(kind)
            ),
            (proof_url, submitted_at, item_id),
        )?;
        if n == 0 {
            return Ok(None);
        }
        self.get_item(kind, item_id)
    }

    fn set_item_returned(
        &self,
        kind: ItemKind,
        item_id: &str,
        returned: bool,
        status: ApprovalStatus,
    ) -> Result<Option<ItemRecord>> {
        let n = self.conn.execute(
            &format!(
                "UPDATE {} SET returned = ?, approval_status = ? WHERE id = ?",
                item_table(kind)
            ),
            (returned as i64, status.as_str(), item_id),
        )?;
        if n == 0 {
            return Ok(None);
        }
        self.get_item(kind, item_id)
    }
}

/// One UPDATE for every workflow column of the decision.
fn write_approval(
    conn: &Connection,
    kind: ItemKind,
    item_id: &str,
    update: &ApprovalUpdate,
) -> Result<bool> {
    let n = conn.execute(
        &format!(
            "UPDATE {}
             SET approval_status = ?, returned = ?, rejection_reason = ?, approved_by = ?, approved_at = ?
             WHERE id = ?",
            item_table(kind)
        ),
        (
            update.status.as_str(),
            update.returned as i64,
            &update.rejection_reason,
            &update.approved_by,
            &update.approved_at,
            item_id,
        ),
    )?;
    Ok(n > 0)
}
