use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

/// Row counts reported back from a fresh seed, so the dashboard can show
/// what a new session starts with.
#[derive(Debug, Clone, Copy)]
pub struct SeedCounts {
    pub students: usize,
    pub instructors: usize,
    pub programs: usize,
    pub schedules: usize,
    pub attendance_records: usize,
}

/// Opens the session store. The database lives entirely in memory: it is
/// created here, seeded by `seed_demo_data`, and ceases to exist when the
/// session closes or the process exits. Nothing touches disk.
pub fn open_store() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            mobile TEXT,
            birth_date TEXT,
            gender TEXT,
            blood_group TEXT,
            nationality TEXT,
            joining_date TEXT,
            address_line1 TEXT,
            address_line2 TEXT,
            city TEXT,
            state TEXT,
            pincode TEXT,
            country TEXT,
            guardian_name TEXT,
            guardian_relation TEXT,
            guardian_contact TEXT,
            guardian_email TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructors(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS programs(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            instructor_id TEXT,
            start_date TEXT,
            end_date TEXT,
            FOREIGN KEY(instructor_id) REFERENCES instructors(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS program_students(
            program_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            PRIMARY KEY(program_id, student_id),
            FOREIGN KEY(program_id) REFERENCES programs(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_program_students_student
         ON program_students(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedules(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            start_at TEXT NOT NULL,
            end_at TEXT NOT NULL,
            time_label TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedules_start ON schedules(start_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            student_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            PRIMARY KEY(student_id, date),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;

    Ok(conn)
}

fn at(day: NaiveDate, hour: u32, min: u32) -> anyhow::Result<NaiveDateTime> {
    day.and_hms_opt(hour, min, 0)
        .with_context(|| format!("invalid seed time {}:{:02} on {}", hour, min, day))
}

fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Seeds the demo dataset a fresh session starts from. `today` anchors the
/// relative rows (schedule entries around the current week, attendance at
/// the start of the current month) so the dashboard always opens onto a
/// populated calendar.
pub fn seed_demo_data(conn: &Connection, today: NaiveDate) -> anyhow::Result<SeedCounts> {
    let tx = conn.unchecked_transaction()?;

    let roster: [(&str, &str, &str); 10] = [
        ("S001", "Alice Johnson", "alice@example.com"),
        ("S002", "Bob Smith", "bob@example.com"),
        ("S003", "Charlie Brown", "charlie@example.com"),
        ("S004", "Diana Prince", "diana@example.com"),
        ("S005", "Ethan Hunt", "ethan@example.com"),
        ("S006", "Fiona Gallagher", "fiona@example.com"),
        ("S007", "George Lucas", "george@example.com"),
        ("S008", "Hannah Baker", "hannah@example.com"),
        ("S009", "Ian Curtis", "ian@example.com"),
        ("S010", "Jane Doe", "jane@example.com"),
    ];
    for (id, name, email) in roster {
        tx.execute(
            "INSERT INTO students(id, name, email) VALUES(?, ?, ?)",
            (id, name, email),
        )?;
    }

    // Two roster members carry the full detail record the profile page shows.
    tx.execute(
        "UPDATE students SET
            mobile = '+1-555-0134',
            birth_date = '2005-03-12',
            gender = 'Female',
            blood_group = 'B+',
            nationality = 'American',
            joining_date = '2021-06-15',
            address_line1 = '123 Maple Street',
            address_line2 = 'Apt 4B',
            city = 'Springfield',
            state = 'Illinois',
            pincode = '62704',
            country = 'USA',
            guardian_name = 'Martha Johnson',
            guardian_relation = 'Mother',
            guardian_contact = '+1-555-0178',
            guardian_email = 'martha.johnson@example.com'
         WHERE id = 'S001'",
        [],
    )?;
    tx.execute(
        "UPDATE students SET
            mobile = '+1-555-0192',
            birth_date = '2006-07-20',
            gender = 'Male',
            blood_group = 'O+',
            nationality = 'American',
            joining_date = '2022-04-10',
            address_line1 = '45 Birch Avenue',
            address_line2 = NULL,
            city = 'Centerville',
            state = 'Ohio',
            pincode = '45459',
            country = 'USA',
            guardian_name = 'Frank Brown',
            guardian_relation = 'Father',
            guardian_contact = '+1-555-0166',
            guardian_email = 'frank.brown@example.com'
         WHERE id = 'S003'",
        [],
    )?;

    let faculty: [(&str, &str, &str, &str); 6] = [
        ("I001", "Dr. Smith", "smith@example.com", "Math"),
        ("I002", "Prof. Johnson", "johnson@example.com", "Physics"),
        ("I003", "Dr. Brown", "brown@example.com", "Chemistry"),
        ("I004", "Dr. Lee", "lee@example.com", "Biology"),
        ("I005", "Prof. Davis", "davis@example.com", "History"),
        ("I006", "Dr. Miller", "miller@example.com", "English"),
    ];
    for (id, name, email, subject) in faculty {
        tx.execute(
            "INSERT INTO instructors(id, name, email, subject) VALUES(?, ?, ?, ?)",
            (id, name, email, subject),
        )?;
    }

    // School year bracketing `today`: July through the end of March.
    let year_start_year = if today.month() >= 7 {
        today.year()
    } else {
        today.year() - 1
    };
    let year_start = NaiveDate::from_ymd_opt(year_start_year, 7, 1)
        .context("school year start")?;
    let year_end = NaiveDate::from_ymd_opt(year_start_year + 1, 3, 31)
        .context("school year end")?;

    let programs: [(&str, &str, &str, &[&str]); 2] = [
        ("P001", "Mathematics 101", "I001", &["S001", "S002"]),
        ("P002", "Physics 201", "I002", &["S002", "S003"]),
    ];
    for (id, name, instructor_id, student_ids) in programs {
        tx.execute(
            "INSERT INTO programs(id, name, instructor_id, start_date, end_date)
             VALUES(?, ?, ?, ?, ?)",
            (
                id,
                name,
                instructor_id,
                year_start.format("%Y-%m-%d").to_string(),
                year_end.format("%Y-%m-%d").to_string(),
            ),
        )?;
        for student_id in student_ids {
            tx.execute(
                "INSERT INTO program_students(program_id, student_id) VALUES(?, ?)",
                (id, student_id),
            )?;
        }
    }

    tx.execute(
        "INSERT INTO schedules(id, title, start_at, end_at, time_label)
         VALUES(?, ?, ?, ?, ?)",
        (
            "SCH001",
            "Morning Standup",
            fmt_ts(at(today, 10, 0)?),
            fmt_ts(at(today + Duration::days(4), 10, 30)?),
            "10:00",
        ),
    )?;
    tx.execute(
        "INSERT INTO schedules(id, title, start_at, end_at, time_label)
         VALUES(?, ?, ?, ?, ?)",
        (
            "SCH002",
            "Project Review",
            fmt_ts(at(today + Duration::days(2), 15, 0)?),
            fmt_ts(at(today + Duration::days(6), 16, 0)?),
            "15:00",
        ),
    )?;

    let month_first = today.with_day(1).context("first of month")?;
    let marks: [(&str, NaiveDate, &str); 6] = [
        ("S001", month_first, "Present"),
        ("S001", month_first + Duration::days(1), "Absent"),
        ("S001", month_first + Duration::days(2), "Present"),
        ("S003", month_first, "Present"),
        ("S003", month_first + Duration::days(1), "Present"),
        ("S003", month_first + Duration::days(2), "Present"),
    ];
    for (student_id, date, status) in marks {
        tx.execute(
            "INSERT INTO attendance(student_id, date, status) VALUES(?, ?, ?)",
            (student_id, date.format("%Y-%m-%d").to_string(), status),
        )?;
    }

    tx.commit()?;

    Ok(SeedCounts {
        students: roster.len(),
        instructors: faculty.len(),
        programs: programs.len(),
        schedules: 2,
        attendance_records: marks.len(),
    })
}
